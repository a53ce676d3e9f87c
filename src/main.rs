// ==========================================
// 学校纪律追踪系统 - 命令行入口
// ==========================================
// 输出: 成功时 stdout 打印 JSON；失败时打印 ErrorResponse JSON 并以非零码退出
// 日志: stderr
// ==========================================

use clap::{Args, Parser, Subcommand};
use discipline_tracker::api::ApiError;
use discipline_tracker::app::commands;
use discipline_tracker::app::{get_default_db_path, AppState};
use discipline_tracker::{i18n, logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "学校纪律追踪系统 - 违纪记录导入", long_about = None)]
struct Cli {
    /// 数据库文件路径（默认: DISCIPLINE_TRACKER_DB_PATH 或用户数据目录）
    #[arg(long, global = true, env = "DISCIPLINE_TRACKER_DB_PATH")]
    db: Option<String>,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    /// 界面语言（es / en）
    #[arg(long, global = true)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 建表（可重复执行）
    InitDb,
    /// 从 JSON 文件创建学年与三个学期
    SeedPeriods(SeedArgs),
    /// 列出学期区间
    Periods(SchoolYearArgs),
    /// 导入违纪 CSV（不带 --duplicates 为预览，带则为提交）
    Import(ImportArgs),
    /// 按日期探测所属学期
    DetectPeriod(DetectArgs),
    /// 按日期诊断 CSV 每行所属学期（不落库）
    Diagnose(DiagnoseArgs),
    /// 列出最近的导入批次
    Batches(BatchesArgs),
    /// 查看或修改配置
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// 学年载荷 JSON 文件
    file: PathBuf,
}

#[derive(Args, Debug)]
struct SchoolYearArgs {
    #[arg(long)]
    school_year_id: Option<String>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// CSV 文件
    file: String,
    /// 违纪类型（Tipo I / Tipo II / Tipo III）
    #[arg(long)]
    fault_type: String,
    /// 目标学期 ID
    #[arg(long)]
    trimester_id: String,
    /// 重复记录处理 JSON: {"action":"update","duplicateHashes":["..."]}
    #[arg(long)]
    duplicates: Option<String>,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// 日期（YYYY-MM-DD）
    date: String,
    #[arg(long)]
    school_year_id: Option<String>,
}

#[derive(Args, Debug)]
struct DiagnoseArgs {
    /// CSV 文件
    file: String,
    #[arg(long)]
    school_year_id: Option<String>,
}

#[derive(Args, Debug)]
struct BatchesArgs {
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// 配置键（与 --value 同时给出时写入）
    #[arg(long, requires = "value")]
    key: Option<String>,
    #[arg(long)]
    value: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    tracing::info!(version = discipline_tracker::VERSION, "{}", discipline_tracker::APP_NAME);

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.locale {
        Some(locale) => i18n::set_locale(&locale),
        None => {
            if let Ok(Some(locale)) = state
                .config_manager
                .get_global_config_value(discipline_tracker::config::config_keys::UI_LOCALE)
            {
                i18n::set_locale(&locale);
            }
        }
    }

    match run(&state, cli.command).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(json) => {
            println!("{}", json);
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, command: Command) -> Result<String, String> {
    match command {
        Command::InitDb => Ok(serde_json::json!({
            "dbPath": state.db_path,
            "message": i18n::t("common.success"),
        })
        .to_string()),
        Command::SeedPeriods(args) => {
            let raw = std::fs::read_to_string(&args.file).map_err(|e| {
                let path = args.file.display().to_string();
                commands::map_api_error(ApiError::NotFound(format!(
                    "{} ({})",
                    i18n::t_with_args("import.file_not_found", &[("path", &path)]),
                    e
                )))
            })?;
            commands::seed_periods(state, &raw)
        }
        Command::Periods(args) => commands::list_academic_periods(state, args.school_year_id).await,
        Command::Import(args) => {
            commands::import_infractions(
                state,
                args.file,
                args.fault_type,
                args.trimester_id,
                args.duplicates,
            )
            .await
        }
        Command::DetectPeriod(args) => {
            commands::detect_academic_period(state, args.date, args.school_year_id).await
        }
        Command::Diagnose(args) => {
            commands::diagnose_periods(state, args.file, args.school_year_id).await
        }
        Command::Batches(args) => commands::list_import_batches(state, args.limit),
        Command::Config(args) => match (args.key, args.value) {
            (Some(key), Some(value)) => commands::set_config_value(state, &key, &value),
            _ => commands::get_config_snapshot(state),
        },
    }
}
