use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;
use std::io::{self, BufRead, Write};

use forma_core::FormaService;
use forma_core::models::{Session, SyncStatus};
use forma_core::service::AuthOutcome;
use forma_core::sync::{AuthProvider, RemoteStore, SyncReport};

use super::helpers::{format_local, print_json};

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(p) = given.filter(|p| !p.is_empty()) {
        return Ok(p);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

fn print_report(report: &SyncReport) {
    println!(
        "Synced {} workouts ({} sets), {} programs, {} meal plans{}",
        report.workouts_synced,
        report.sets_synced,
        report.programs_synced,
        report.meal_plans_synced,
        if report.profile_synced { ", profile" } else { "" }
    );
    if !report.is_clean() {
        eprintln!(
            "{} items failed and stay pending. Run `forma sync` to retry.",
            report.failures()
        );
    }
}

fn print_outcome(outcome: &AuthOutcome) {
    if let Some(ref report) = outcome.sync {
        print_report(report);
    }
    if let Some(ref e) = outcome.sync_error {
        eprintln!("Backup did not run: {e}");
    }
}

fn session_label(session: &Session) -> &str {
    session.email.as_deref().unwrap_or(&session.user_id)
}

pub(crate) async fn cmd_signup<C: AuthProvider + RemoteStore>(
    svc: &FormaService,
    client: &C,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = read_password(password)?;
    let outcome = svc.sign_up(client, client, email, &password).await?;

    if json {
        return print_json(&outcome);
    }
    match outcome.session {
        Some(ref s) => {
            println!("Account created. Signed in as {}", session_label(s));
            print_outcome(&outcome);
        }
        None => println!("Account created. Check {email} to confirm, then run `forma account signin`"),
    }
    Ok(())
}

pub(crate) async fn cmd_signin<C: AuthProvider + RemoteStore>(
    svc: &FormaService,
    client: &C,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = read_password(password)?;
    let outcome = svc.sign_in(client, client, email, &password).await?;

    if json {
        return print_json(&outcome);
    }
    if let Some(ref s) = outcome.session {
        println!("Signed in as {}", session_label(s));
    }
    print_outcome(&outcome);
    Ok(())
}

pub(crate) async fn cmd_signout<A: AuthProvider>(
    svc: &FormaService,
    auth: &A,
    json: bool,
) -> Result<()> {
    let signed_out = svc.sign_out(auth).await?;
    if json {
        println!("{}", serde_json::json!({ "signed_out": signed_out }));
    } else if signed_out {
        println!("Signed out. Local data is kept on this device.");
    } else {
        eprintln!("Not signed in");
    }
    Ok(())
}

#[derive(Serialize)]
struct AccountStatus {
    signed_in: bool,
    user_id: Option<String>,
    email: Option<String>,
    expired: bool,
    backup_configured: bool,
    pending_workouts: usize,
}

pub(crate) fn cmd_status(svc: &FormaService, backup_configured: bool, json: bool) -> Result<()> {
    let session = svc.current_session()?;
    let expired = session.as_ref().is_some_and(|s| s.is_expired(Utc::now()));
    let pending_workouts = svc
        .get_workouts()?
        .iter()
        .filter(|w| w.sync_status == SyncStatus::Pending)
        .count();

    if json {
        return print_json(&AccountStatus {
            signed_in: session.is_some() && !expired,
            user_id: session.as_ref().map(|s| s.user_id.clone()),
            email: session.as_ref().and_then(|s| s.email.clone()),
            expired,
            backup_configured,
            pending_workouts,
        });
    }

    match session {
        Some(ref s) if expired => println!(
            "Session for {} expired. Run `forma account signin` again.",
            session_label(s)
        ),
        Some(ref s) => {
            println!("Signed in as {}", session_label(s));
            if let Some(t) = s.expires_at {
                println!("  Session expires: {}", format_local(t));
            }
        }
        None => println!("Not signed in. Data stays on this device."),
    }
    if !backup_configured {
        println!("Cloud backup is not configured");
    }
    println!("Workouts waiting for backup: {pending_workouts}");
    Ok(())
}

pub(crate) async fn cmd_sync<R: RemoteStore>(
    svc: &FormaService,
    remote: &R,
    json: bool,
) -> Result<()> {
    let report = svc.sync(remote).await?;
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}
