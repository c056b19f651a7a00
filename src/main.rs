// ==========================================
// 周排产订单平衡系统 - 命令行入口
// ==========================================
// 子命令:
// - run:         按配置执行一次平衡（导入 → 平衡 → 导出 → 落库）
// - init-config: 写出默认配置文件
// ==========================================

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use schedule_reconcile::api::ReconcileApi;
use schedule_reconcile::config::{ConfigManager, ConfigOverrides};
use schedule_reconcile::logging;
use std::path::PathBuf;

/// 周排产订单平衡 - 按周对账排产与订单批次并生成转移台账
#[derive(Parser)]
#[command(name = "schedule-reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行一次平衡
    Run {
        /// 配置文件（JSON）
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// 覆写输出目录
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 覆写数据库路径
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// 任一行失败即中止
        #[arg(long)]
        fail_fast: bool,

        /// 以 JSON 输出运行结果
        #[arg(long)]
        json: bool,
    },

    /// 写出默认配置文件
    InitConfig {
        /// 输出路径
        #[arg(default_value = "config.json")]
        path: PathBuf,

        /// 覆盖已有文件
        #[arg(long)]
        force: bool,

        /// 写入默认数据库路径（启用落库）
        #[arg(long)]
        with_db: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            db_path,
            fail_fast,
            json,
        } => {
            let mut config = ConfigManager::load(&config)
                .with_context(|| format!("无法加载配置: {}", config.display()))?;
            ConfigManager::apply_overrides(
                &mut config,
                ConfigOverrides {
                    output_dir,
                    db_path,
                    fail_fast,
                },
            )
            .context("命令行参数无效")?;

            tracing::info!("{} v{}", schedule_reconcile::APP_NAME, schedule_reconcile::VERSION);
            let response = ReconcileApi::new(config).run().context("平衡运行失败")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!(
                    "run_id={} 产品 {} 行, 成功 {}, 失败 {}; 整批转移 {}, 拆分转移 {} ({} 次迭代)",
                    response.run_id,
                    response.items,
                    response.succeeded,
                    response.failures.len(),
                    response.whole_transfers,
                    response.split_transfers,
                    response.split_iterations,
                );
                for failure in &response.failures {
                    println!("  [{}] {}: {}", failure.row_index, failure.item_id, failure.message);
                }
                for file in &response.files {
                    println!("  -> {}", file.display());
                }
            }

            if response.failures.iter().any(|f| f.internal) {
                bail!("存在内部一致性故障，台账可能不完整");
            }
        }
        Commands::InitConfig {
            path,
            force,
            with_db,
        } => {
            if path.exists() && !force {
                bail!("文件已存在: {}（使用 --force 覆盖）", path.display());
            }
            ConfigManager::write_default(&path, with_db)
                .with_context(|| format!("无法写入配置: {}", path.display()))?;
            println!("已写出默认配置: {}", path.display());
        }
    }

    Ok(())
}
