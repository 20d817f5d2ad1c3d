//! Command-line front end for the SWIFT DB record store.
//!
//! # Responsibility
//! - Treat each invocation as one request with an explicit identity.
//! - Print results as JSON on stdout and flash messages on stderr.
//!
//! Configuration comes from `SWIFTDB_*` environment variables, optionally
//! layered over the TOML file named by `SWIFTDB_CONFIG`.

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::process::ExitCode;
use swiftdb_core::db::migrations::current_user_version;
use swiftdb_core::{
    init_logging, open_db, resolve_table_kind, AppConfig, AuthService, DeliverableInput,
    FlashLevel, FormData, LeadService, RecordId, RecordService, RequestContext, ServiceResult,
    Sha256PasswordHasher, SqliteGrantRepository, SqliteRecordRepository, SqliteUserRepository,
    TaskInput,
};

#[derive(Debug, Parser)]
#[command(name = "swiftdb", version, about = "Project record keeping for the SWIFT consortium")]
struct Cli {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct CredentialArgs {
    /// Username for this request.
    #[arg(long = "user", short = 'u', global = true)]
    user: Option<String>,

    /// Password for this request.
    #[arg(long = "password", short = 'p', global = true)]
    password: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or migrate the database file.
    Init,
    /// Add a record (admin).
    Add(FormArgs),
    /// List every record of a table (admin).
    View(KindArgs),
    /// Show one record (admin).
    Get(RowArgs),
    /// Replace the editable fields of a record (admin).
    Edit(EditArgs),
    /// Delete a record (admin).
    Delete(RowArgs),
    /// List your work packages.
    WpList,
    /// Deliverables and tasks of one work package.
    WpSummary(IdArgs),
    /// List your partners.
    PartnerList,
    /// Deliverables and tasks of one partner.
    PartnerSummary(IdArgs),
    /// Update progress of a deliverable you lead.
    DelivEdit(ProgressArgs),
    /// Update progress of a task you lead.
    TaskEdit(ProgressArgs),
    /// Show or replace a user's work package and partner grants (admin).
    Access(AccessArgs),
    /// Change your own password.
    ChangePwd(ChangePwdArgs),
}

#[derive(Debug, Args)]
struct KindArgs {
    /// Table kind, e.g. `Partners` or `Work_Packages`.
    kind: String,
}

#[derive(Debug, Args)]
struct RowArgs {
    kind: String,
    id: RecordId,
}

#[derive(Debug, Args)]
struct IdArgs {
    id: RecordId,
}

#[derive(Debug, Args)]
struct FormArgs {
    kind: String,

    /// Form value as `name=value`; repeat for each field.
    #[arg(long = "field", short = 'f', value_parser = parse_field)]
    fields: Vec<(String, String)>,
}

#[derive(Debug, Args)]
struct EditArgs {
    kind: String,
    id: RecordId,

    /// Form value as `name=value`; repeat for each field.
    #[arg(long = "field", short = 'f', value_parser = parse_field)]
    fields: Vec<(String, String)>,
}

#[derive(Debug, Args)]
struct ProgressArgs {
    id: RecordId,

    /// New progress note; omit to clear it.
    #[arg(long)]
    progress: Option<String>,

    /// New completion percentage.
    #[arg(long)]
    percent: i64,
}

#[derive(Debug, Args)]
struct AccessArgs {
    user_id: RecordId,

    /// Work package code to grant; repeat for each.
    #[arg(long = "wp")]
    work_packages: Vec<String>,

    /// Partner name to grant; repeat for each.
    #[arg(long = "partner")]
    partners: Vec<String>,

    /// Replace the stored grants with the given sets instead of showing them.
    #[arg(long)]
    apply: bool,
}

#[derive(Debug, Args)]
struct ChangePwdArgs {
    #[arg(long)]
    current: String,
    #[arg(long)]
    new: String,
    #[arg(long)]
    confirm: String,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected `name=value`, got `{raw}`"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    init_logging(config.log_level, &config.log_dir).context("initializing logging")?;
    let conn = open_db(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    if let Command::Init = cli.command {
        let version = current_user_version(&conn)?;
        info!("event=cli_init module=cli status=ok schema_version={version}");
        return print_json(&serde_json::json!({ "schema_version": version }));
    }

    let records = SqliteRecordRepository::try_new(&conn)?;
    let grants = SqliteGrantRepository::try_new(&conn)?;
    let users = SqliteUserRepository::try_new(&conn)?;
    let hasher = Sha256PasswordHasher::default();
    let auth = AuthService::new(users, hasher, &config.admin_password)?;
    let admin = RecordService::new(records, users, hasher);
    let lead = LeadService::new(records, grants, users);

    let mut ctx = RequestContext::anonymous();
    let (Some(username), Some(password)) = (cli.credentials.user, cli.credentials.password) else {
        bail!("--user and --password are required");
    };
    let login = auth.login(&mut ctx, &username, &password);
    if login.is_err() {
        return respond(&mut ctx, login);
    }
    // Login succeeded; its flash is noise for scripted use.
    ctx.take_flashes();

    match cli.command {
        Command::Init => Ok(()),
        Command::Add(args) => {
            let form: FormData = args.fields.into_iter().collect();
            let result = resolve_table_kind(&args.kind)
                .and_then(|kind| admin.create_from_form(&mut ctx, kind, &form));
            respond(&mut ctx, result.map(|id| serde_json::json!({ "id": id })))
        }
        Command::View(args) => {
            let result = resolve_table_kind(&args.kind).and_then(|kind| admin.view(&ctx, kind));
            respond(&mut ctx, result)
        }
        Command::Get(args) => {
            let result =
                resolve_table_kind(&args.kind).and_then(|kind| admin.get(&ctx, kind, args.id));
            respond(&mut ctx, result)
        }
        Command::Edit(args) => {
            let form: FormData = args.fields.into_iter().collect();
            let result = resolve_table_kind(&args.kind)
                .and_then(|kind| admin.update_from_form(&mut ctx, kind, args.id, &form));
            respond(&mut ctx, result)
        }
        Command::Delete(args) => {
            let result = resolve_table_kind(&args.kind)
                .and_then(|kind| admin.delete(&mut ctx, kind, args.id));
            respond(&mut ctx, result)
        }
        Command::WpList => {
            let result = lead.wp_list(&ctx);
            respond(&mut ctx, result)
        }
        Command::WpSummary(args) => {
            let result = lead.wp_summary(&ctx, args.id);
            respond(&mut ctx, result)
        }
        Command::PartnerList => {
            let result = lead.partner_list(&ctx);
            respond(&mut ctx, result)
        }
        Command::PartnerSummary(args) => {
            let result = lead.partner_summary(&ctx, args.id);
            respond(&mut ctx, result)
        }
        Command::DelivEdit(args) => {
            let result = lead.deliverable_for_edit(&ctx, args.id).and_then(|stored| {
                let input = DeliverableInput {
                    progress: args.progress,
                    percent: args.percent,
                    ..DeliverableInput::from(&stored)
                };
                lead.edit_deliverable(&mut ctx, args.id, input)
            });
            respond(&mut ctx, result)
        }
        Command::TaskEdit(args) => {
            let result = lead.task_for_edit(&ctx, args.id).and_then(|stored| {
                let input = TaskInput {
                    progress: args.progress,
                    percent: args.percent,
                    ..TaskInput::from(&stored)
                };
                lead.edit_task(&mut ctx, args.id, input)
            });
            respond(&mut ctx, result)
        }
        Command::Access(args) if args.apply => {
            let result = lead.access().reconcile_grants(
                &mut ctx,
                args.user_id,
                &args.work_packages,
                &args.partners,
            );
            respond(&mut ctx, result)
        }
        Command::Access(args) => {
            let result = lead.access().current_grants(&ctx, args.user_id);
            respond(&mut ctx, result)
        }
        Command::ChangePwd(args) => {
            let result = auth.change_password(&mut ctx, &args.current, &args.new, &args.confirm);
            respond(&mut ctx, result)
        }
    }
}

/// Prints the value or the failure, then drains pending flashes to stderr.
fn respond<T: Serialize>(ctx: &mut RequestContext, result: ServiceResult<T>) -> anyhow::Result<()> {
    let outcome = match result {
        Ok(value) => print_json(&value),
        Err(err) => {
            let detail = err.to_string();
            ctx.recover::<()>(Err(err));
            Err(anyhow!(detail))
        }
    };
    for flash in ctx.take_flashes() {
        let level = match flash.level {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        };
        eprintln!("[{level}] {}", flash.message);
    }
    outcome
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_field, Cli, Command};
    use clap::Parser;

    #[test]
    fn field_values_may_contain_equals_signs() {
        assert_eq!(
            parse_field("progress=a=b").unwrap(),
            ("progress".to_string(), "a=b".to_string())
        );
        assert!(parse_field("progress").is_err());
    }

    #[test]
    fn credentials_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "swiftdb",
            "access",
            "3",
            "--wp",
            "WP-C1",
            "--wp",
            "WP-C2",
            "--apply",
            "--user",
            "admin",
            "--password",
            "secret",
        ])
        .unwrap();
        assert_eq!(cli.credentials.user.as_deref(), Some("admin"));
        match cli.command {
            Command::Access(args) => {
                assert_eq!(args.user_id, 3);
                assert_eq!(args.work_packages, vec!["WP-C1", "WP-C2"]);
                assert!(args.apply);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
