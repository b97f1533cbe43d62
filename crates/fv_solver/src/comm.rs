// crates/fv_solver/src/comm.rs

//! 进程间通信门面
//!
//! SPMD 模型：所有 rank 执行相同控制流，跨 rank 的唯一顺序
//! 约束是集体操作的调用顺序（构造上各 rank 一致）。每次进入
//! 门面都可能是全局同步点；场代数本身从不阻塞。
//!
//! 核心只通过两类入口使用通信：
//! - 场层的 halo 交换（`PROCESSOR` 边界片的幽灵单元）
//! - 线性求解器的内积 / 范数全局归约
//!
//! 单进程实现 [`SerialComm`] 的所有集体操作都是平凡的；
//! MPI 后端按相同契约实现本 trait 即可接入，核心不感知差异。
//! 固定 rank 数下的逐位可复现性要求归约按确定性树实施，
//! 这是后端实现的义务而非核心的。

use fv_core::Scalar;

/// 通信门面
///
/// 任一 rank 的致命错误通过 [`Comm::abort`] 集体中止整个世界。
pub trait Comm: Send + Sync {
    /// 本进程 rank
    fn host_id(&self) -> usize;

    /// 进程总数
    fn n_hosts(&self) -> usize;

    /// 全局求和
    fn global_sum(&self, local: Scalar) -> Scalar;

    /// 全局最大值
    fn global_max(&self, local: Scalar) -> Scalar;

    /// 全局最小值
    fn global_min(&self, local: Scalar) -> Scalar;

    /// 与 rank `peer` 交换定长数据
    ///
    /// 发送 `send` 并把对端数据写入 `recv`。点对点、可阻塞。
    fn exchange(&self, peer: usize, send: &[Scalar], recv: &mut [Scalar]);

    /// 集体中止
    fn abort(&self, reason: &str) -> !;
}

/// 单进程通信实现
///
/// 所有归约恒等返回；没有 `PROCESSOR` 边界片时 `exchange`
/// 不应被调用到。
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Comm for SerialComm {
    #[inline]
    fn host_id(&self) -> usize {
        0
    }

    #[inline]
    fn n_hosts(&self) -> usize {
        1
    }

    #[inline]
    fn global_sum(&self, local: Scalar) -> Scalar {
        local
    }

    #[inline]
    fn global_max(&self, local: Scalar) -> Scalar {
        local
    }

    #[inline]
    fn global_min(&self, local: Scalar) -> Scalar {
        local
    }

    fn exchange(&self, peer: usize, _send: &[Scalar], _recv: &mut [Scalar]) {
        // 单进程不存在对端；出现即是程序错误
        self.abort(&format!("单进程运行却请求与 rank {} 交换", peer));
    }

    fn abort(&self, reason: &str) -> ! {
        log::error!("集体中止: {}", reason);
        std::process::exit(2);
    }
}
