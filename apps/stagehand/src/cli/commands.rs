//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::builtins::{builtin_registry, install};
use crate::config::Settings;
use crate::error::AppError;
use serde_json::json;
use stagehand_core::{
    BootstrapPlan, Bootstrapper, ExtensionContext, Hook, Stage, StagehandError, StoreSlot,
    load_manifest,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// DEADLINE
// =============================================================================

/// Drive a bootstrap future under the optional timeout, aborting on Ctrl-C.
///
/// Aborting drops the future. The normalized manifest is only flushed once
/// every module has been resolved, so a deadline that fires during
/// resolution leaves the manifest file exactly as it was.
pub async fn with_deadline<T, F>(future: F, timeout: Option<Duration>) -> Result<T, AppError>
where
    F: Future<Output = Result<T, StagehandError>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, future).await {
                Ok(result) => result.map_err(AppError::from),
                Err(_) => Err(AppError::Timeout(limit)),
            },
            None => future.await.map_err(AppError::from),
        }
    };

    tokio::select! {
        result = bounded => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received, abandoning bootstrap");
            Err(AppError::Interrupted)
        }
    }
}

fn bootstrapper(settings: &Settings) -> Bootstrapper {
    Bootstrapper::new(&settings.root, Arc::new(builtin_registry()))
        .with_manifest_file(settings.manifest.clone())
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Bootstrap the root and print what the context ended up holding.
pub async fn cmd_run(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let bootstrapper = bootstrapper(settings);
    let context = with_deadline(bootstrapper.run(), settings.timeout).await?;
    let summary = context_summary(&context);

    if json_mode {
        print_json(&summary);
    } else {
        println!("Bootstrap complete");
        println!();
        println!("Store slots:");
        for slot in StoreSlot::ALL {
            let state = if context.has_store(slot) { "filled" } else { "empty" };
            println!("  {:<18} {}", slot.as_str(), state);
        }
        println!();
        println!("Collections:");
        println!("  Loaders:          {}", context.loaders().len());
        println!("  Validators:       {}", context.validators().len());
        println!("  Context builders: {}", context.context_builders().len());
        println!("  Senders:          {}", context.senders().len());
        println!("  UI components:    {}", context.ui_components().len());
        if let Some(hooks) = summary["hooks"].as_object().filter(|hooks| !hooks.is_empty()) {
            println!();
            println!("Hooks:");
            for (hook, count) in hooks {
                println!("  {:<22} {}", hook, count);
            }
        }
    }

    Ok(())
}

/// JSON view of a bootstrapped context.
#[must_use]
pub fn context_summary(context: &ExtensionContext) -> serde_json::Value {
    let slots: Vec<&str> = context
        .filled_slots()
        .into_iter()
        .map(StoreSlot::as_str)
        .collect();
    let hooks: serde_json::Map<String, serde_json::Value> = Hook::ALL
        .into_iter()
        .filter_map(|hook| {
            let count = context.hooks().handlers(hook).len();
            (count > 0).then(|| (hook.as_str().to_string(), json!(count)))
        })
        .collect();
    json!({
        "slots": slots,
        "hooks": hooks,
        "loaders": context.loaders().len(),
        "validators": context.validators().len(),
        "context_builders": context.context_builders().len(),
        "senders": context.senders().len(),
        "ui_components": context.ui_components().len()
    })
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate the manifest without touching any module.
pub fn cmd_check(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let manifest = load_manifest(&settings.root, &settings.manifest)?;

    if json_mode {
        let stages: serde_json::Map<String, serde_json::Value> = Stage::ALL
            .into_iter()
            .map(|stage| (stage.key().to_string(), json!(manifest.entries(stage).len())))
            .collect();
        print_json(&json!({
            "manifest": settings.manifest,
            "valid": true,
            "entries": manifest.len(),
            "stages": stages
        }));
    } else {
        println!("Manifest {} is valid", settings.manifest);
        for stage in Stage::ALL {
            println!("  {:<16} {} entries", stage.key(), manifest.entries(stage).len());
        }
    }

    Ok(())
}

// =============================================================================
// PLAN COMMAND
// =============================================================================

/// Print the schedule a run would follow.
pub async fn cmd_plan(settings: &Settings, json_mode: bool) -> Result<(), AppError> {
    let bootstrapper = bootstrapper(settings);
    let plan = with_deadline(bootstrapper.plan(), settings.timeout).await?;

    if json_mode {
        print_json(&plan_summary(&plan));
        return Ok(());
    }

    println!("Activation plan ({} extensions)", plan.activation_count());
    for stage in plan.stages() {
        let key = stage.stage().key();
        println!();
        println!("{key}:");
        if stage.waves().is_empty() {
            println!("  (empty)");
            continue;
        }
        for (index, wave) in stage.waves().waves().iter().enumerate() {
            let members: Vec<String> = wave
                .iter()
                .map(|name| {
                    let status = plan
                        .manifest()
                        .entry(stage.stage(), name)
                        .map(|entry| entry.status.to_string())
                        .unwrap_or_default();
                    format!("{name} [{status}]")
                })
                .collect();
            println!("  wave {index}: {}", members.join(", "));
        }
    }

    Ok(())
}

/// JSON view of a plan: waves and reconciled statuses per stage.
#[must_use]
pub fn plan_summary(plan: &BootstrapPlan) -> serde_json::Value {
    let stages: serde_json::Map<String, serde_json::Value> = plan
        .stages()
        .iter()
        .map(|stage| {
            let statuses: serde_json::Map<String, serde_json::Value> = plan
                .manifest()
                .entries(stage.stage())
                .iter()
                .map(|entry| (entry.name.clone(), json!(entry.status.to_string())))
                .collect();
            (
                stage.stage().key().to_string(),
                json!({
                    "waves": stage.waves().waves(),
                    "eligible": stage.eligible_waves(),
                    "statuses": statuses
                }),
            )
        })
        .collect();

    json!({
        "activations": plan.activation_count(),
        "stages": stages
    })
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write the default manifest and built-in module files.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<(), AppError> {
    let written = install(&settings.root, &settings.manifest, force)?;
    println!("Initialized {} in {:?}", settings.manifest, settings.root);
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}
