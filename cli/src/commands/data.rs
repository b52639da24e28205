use anyhow::{Result, bail};

use forma_core::FormaService;
use forma_core::db::keys;

use super::helpers::confirm;

/// Accept a store key as written (`forma_workouts`) or without its prefix.
fn resolve_key(name: &str) -> Result<&'static str> {
    let name = name.trim().to_lowercase();
    if let Some(key) = keys::ALL
        .iter()
        .copied()
        .find(|k| *k == name || k.strip_prefix("forma_") == Some(name.as_str()))
    {
        return Ok(key);
    }
    let short: Vec<&str> = keys::ALL
        .iter()
        .map(|k| k.trim_start_matches("forma_"))
        .collect();
    bail!("Unknown data key '{name}'. Use one of: {}", short.join(", "))
}

pub(crate) fn cmd_data_reset(svc: &FormaService, yes: bool, json: bool) -> Result<()> {
    if !yes {
        if json {
            bail!("Refusing to erase data without --yes");
        }
        if !confirm("Erase ALL local workouts, templates, programs, and your profile?")? {
            eprintln!("Aborted");
            return Ok(());
        }
    }

    svc.clear_all_data()?;
    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("All local data erased");
    }
    Ok(())
}

pub(crate) fn cmd_data_repair(svc: &FormaService, key: &str, json: bool) -> Result<()> {
    let key = resolve_key(key)?;
    let moved = svc.repair_key(key)?;

    if json {
        println!("{}", serde_json::json!({ "key": key, "moved_aside": moved }));
    } else if moved {
        println!("Moved '{key}' aside to '{key}.corrupt'. It now reads as empty.");
    } else {
        println!("'{key}' holds no data, nothing to repair");
    }
    Ok(())
}
