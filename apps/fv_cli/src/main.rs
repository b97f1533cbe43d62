// apps/fv_cli/src/main.rs

//! FvFlow 命令行界面
//!
//! 用法：`fv_cli <controls>`，controls 为嵌套块控制文件。
//! 按 `general.solver` 分发到 piso / diffusion / transport /
//! potential 驱动。
//!
//! 退出码：0 成功；1 网格目录缺失；2 求解器致命错误。
//!
//! 多进程运行时 rank r 读取网格目录 `<mesh><r>`；当前内置
//! 单进程通信门面，MPI 后端按 `fv_solver::comm::Comm` 契约
//! 接入即可，主流程不变。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use fv_config::{Controls, ControlsText};
use fv_io::CaseObserver;
use fv_mesh::reader;
use fv_solver::comm::{Comm, SerialComm};
use fv_solver::drivers;
use fv_solver::world::World;

/// FvFlow 非结构化同位网格有限体积求解器
#[derive(Parser)]
#[command(name = "fv_cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FvFlow finite volume CFD solver", long_about = None)]
struct Cli {
    /// 控制文件路径
    controls: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli.controls) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::MeshMissing(dir)) => {
            log::error!("网格目录不存在: {}", dir.display());
            ExitCode::from(1)
        }
        Err(RunError::Fatal(msg)) => {
            log::error!("{}", msg);
            ExitCode::from(2)
        }
    }
}

enum RunError {
    MeshMissing(PathBuf),
    Fatal(String),
}

fn run(controls_path: &Path) -> Result<(), RunError> {
    let comm = SerialComm;

    // 控制文件
    let text = ControlsText::from_path(controls_path)
        .map_err(|e| RunError::Fatal(format!("控制文件解析失败: {}", e)))?;
    let controls = Controls::from_text(&text);

    // 网格：rank r 读取 <mesh><r>
    let base = controls_path.parent().unwrap_or_else(|| Path::new("."));
    let dir = reader::mesh_dir(base, &controls.mesh_name, comm.host_id(), comm.n_hosts());
    let mesh = match reader::read_mesh(&dir, &controls.mesh_name) {
        Ok(m) => m,
        Err(fv_mesh::MeshError::DirectoryMissing(d)) => return Err(RunError::MeshMissing(d)),
        Err(e) => return Err(RunError::Fatal(format!("网格读取失败: {}", e))),
    };

    let mut world = World::new(mesh, controls, Box::new(comm), dir);
    let mut observer = CaseObserver::new(&world);

    drivers::run(&mut world, &text, &mut observer)
        .map_err(|e| RunError::Fatal(format!("求解失败: {}", e)))
}

fn init_logging(level: &str) {
    let level = match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    // log 门面记录桥接到 tracing
    let _ = tracing_log::LogTracer::init();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
