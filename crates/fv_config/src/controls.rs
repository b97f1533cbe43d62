// crates/fv_config/src/controls.rs

//! 求解器控制参数
//!
//! [`Controls`] 对应控制文件的 `general` 块，加载后在时间推进
//! 循环中只读。格式枚举的 0 号变体即未知值的回退变体。

use serde::{Deserialize, Serialize};

use fv_core::{Scalar, Vector};

use crate::params::{ControlsText, Schema, TypeTag, Value};

// ============================================================
// 枚举
// ============================================================

/// 为控制文件枚举生成候选表与序号转换
macro_rules! controls_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// 控制文件中的候选拼写，顺序即变体序号
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            /// 由变体序号构造（越界回退 0 号变体）
            pub fn from_index(i: usize) -> Self {
                const ALL: &[$name] = &[$($name::$variant),+];
                ALL.get(i).copied().unwrap_or(ALL[0])
            }
        }
    };
}

controls_enum! {
    /// 稳态 / 瞬态
    State {
        Steady => "STEADY",
        Transient => "TRANSIENT",
    }
}

impl Default for State {
    fn default() -> Self {
        Self::Steady
    }
}

controls_enum! {
    /// 对流离散格式
    ///
    /// UDS 隐式单调；CDS 隐式中心；BLENDED 按 blend_factor 线性
    /// 组合；TVD 族以 UDS 为隐式核心，限制器修正显式进源项
    /// （延迟修正）。
    ConvectionScheme {
        Uds => "UDS",
        Cds => "CDS",
        Blended => "BLENDED",
        Minmod => "MINMOD",
        Superbee => "SUPERBEE",
        Vanleer => "VANLEER",
        Muscl => "MUSCL",
    }
}

impl Default for ConvectionScheme {
    fn default() -> Self {
        Self::Uds
    }
}

impl ConvectionScheme {
    /// 是否为 TVD 限制器族
    pub fn is_tvd(self) -> bool {
        matches!(
            self,
            Self::Minmod | Self::Superbee | Self::Vanleer | Self::Muscl
        )
    }
}

controls_enum! {
    /// 非正交修正方案
    NonOrthoScheme {
        None => "NONE",
        Minimum => "MINIMUM",
        Orthogonal => "ORTHOGONAL",
        OverRelaxed => "OVER_RELAXED",
    }
}

impl Default for NonOrthoScheme {
    fn default() -> Self {
        Self::OverRelaxed
    }
}

controls_enum! {
    /// 时间离散格式
    ///
    /// BDF1 即后向 Euler。`runge_kutta > 1` 时显式 RK 优先，
    /// 此处的设定被忽略并告警。
    TimeScheme {
        Euler => "EULER",
        Bdf1 => "BDF1",
        Bdf2 => "BDF2",
    }
}

impl Default for TimeScheme {
    fn default() -> Self {
        Self::Euler
    }
}

impl TimeScheme {
    /// 所需历史时间层数
    pub fn n_history(self) -> usize {
        match self {
            Self::Euler | Self::Bdf1 => 1,
            Self::Bdf2 => 2,
        }
    }
}

controls_enum! {
    /// Krylov 方法偏好
    ///
    /// 非对称系统无条件使用 BiCGStab；对称系统按此偏好。
    Method {
        Pcg => "PCG",
        BiCgStab => "BICGSTAB",
    }
}

impl Default for Method {
    fn default() -> Self {
        Self::Pcg
    }
}

controls_enum! {
    /// 预条件器
    Preconditioner {
        Diag => "DIAG",
        Dilu => "DILU",
        Sor => "SOR",
    }
}

impl Default for Preconditioner {
    fn default() -> Self {
        Self::Diag
    }
}

controls_enum! {
    /// 并行同步策略
    ///
    /// BLOCKED 在每次 SpMV 前同步 halo；ASYNCHRONOUS 以上一迭代
    /// 的幽灵值重叠通信与内部计算。
    ParallelMethod {
        Blocked => "BLOCKED",
        Asynchronous => "ASYNCHRONOUS",
    }
}

impl Default for ParallelMethod {
    fn default() -> Self {
        Self::Blocked
    }
}

controls_enum! {
    /// 湍流模型
    TurbulenceKind {
        None => "NONE",
        MixingLength => "MIXING_LENGTH",
        Ke => "KE",
        RngKe => "RNG_KE",
        RealizableKe => "REALIZABLE_KE",
        Kw => "KW",
        Les => "LES",
    }
}

impl Default for TurbulenceKind {
    fn default() -> Self {
        Self::None
    }
}

/// 求解器种类（`general.solver`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    #[default]
    Piso,
    Diffusion,
    Transport,
    Potential,
}

impl SolverKind {
    /// 由 `general.solver` 的单词解析，未知回退 piso
    pub fn parse(word: &str) -> Self {
        match word.to_ascii_lowercase().as_str() {
            "piso" => Self::Piso,
            "diffusion" => Self::Diffusion,
            "transport" => Self::Transport,
            "potential" => Self::Potential,
            other => {
                log::warn!("未知求解器 '{}'，回退 piso", other);
                Self::Piso
            }
        }
    }
}

// ============================================================
// 物性参数
// ============================================================

/// 材料与重力（`general` 块的物性键）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralProps {
    /// 密度
    pub rho: Scalar,
    /// 运动粘度
    pub viscosity: Scalar,
    /// 热导率
    pub conductivity: Scalar,
    /// 重力加速度
    pub gravity: Vector,
}

impl Default for GeneralProps {
    fn default() -> Self {
        Self {
            rho: 1.0,
            viscosity: 1e-5,
            conductivity: 1e-4,
            gravity: Vector::new(0.0, 0.0, -9.81),
        }
    }
}

// ============================================================
// Controls
// ============================================================

/// 进程级控制参数（`general` 块）
///
/// 由控制文件一次性填充，时间推进循环内不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controls {
    /// 求解器种类
    pub solver: SolverKind,
    /// 网格名（即网格目录名；rank r 读 `<mesh><r>`）
    pub mesh_name: String,
    /// 稳态 / 瞬态
    pub state: State,
    /// 时间步长
    pub dt: Scalar,
    /// 起始步
    pub start_step: usize,
    /// 结束步
    pub end_step: usize,
    /// 写出间隔（步）
    pub write_interval: usize,
    /// 对流格式
    pub convection_scheme: ConvectionScheme,
    /// 非正交修正
    pub nonortho_scheme: NonOrthoScheme,
    /// 时间格式
    pub time_scheme: TimeScheme,
    /// 显式 Runge-Kutta 级数（0/1 关闭）
    pub runge_kutta: usize,
    /// 时间格式隐式因子（Crank-Nicolson 混合；1 为全隐式）
    pub implicit_factor: Scalar,
    /// BLENDED 对流格式的混合因子
    pub blend_factor: Scalar,
    /// Krylov 方法偏好
    pub method: Method,
    /// 预条件器
    pub preconditioner: Preconditioner,
    /// 收敛容差 ‖r‖/‖b‖
    pub tolerance: Scalar,
    /// 最大迭代次数（软超时：报告不收敛但不致命）
    pub max_iterations: usize,
    /// SOR 松弛因子
    pub sor_omega: Scalar,
    /// 并行同步策略
    pub parallel_method: ParallelMethod,
    /// 探针位置
    pub probe: Vec<Vector>,
    /// 场存储层的多项式阶配置（直通参数）
    pub npx: usize,
    /// 同上
    pub npy: usize,
    /// 同上
    pub npz: usize,
    /// 物性参数
    pub general: GeneralProps,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            solver: SolverKind::Piso,
            mesh_name: "grid".to_string(),
            state: State::Steady,
            dt: 0.1,
            start_step: 0,
            end_step: 0,
            write_interval: 1,
            convection_scheme: ConvectionScheme::Uds,
            nonortho_scheme: NonOrthoScheme::OverRelaxed,
            time_scheme: TimeScheme::Euler,
            runge_kutta: 0,
            implicit_factor: 1.0,
            blend_factor: 0.5,
            method: Method::Pcg,
            preconditioner: Preconditioner::Diag,
            tolerance: 1e-5,
            max_iterations: 1000,
            sor_omega: 1.7,
            parallel_method: ParallelMethod::Blocked,
            probe: Vec::new(),
            npx: 1,
            npy: 1,
            npz: 1,
            general: GeneralProps::default(),
        }
    }
}

impl Controls {
    /// `general` 块的登记表
    pub fn schema() -> Schema {
        let mut s = Schema::new();
        s.enroll("solver", TypeTag::Word)
            .enroll("mesh", TypeTag::Word)
            .enroll("state", TypeTag::Enum(State::NAMES))
            .enroll("dt", TypeTag::Scalar)
            .enroll("start_step", TypeTag::Int)
            .enroll("end_step", TypeTag::Int)
            .enroll("write_interval", TypeTag::Int)
            .enroll("convection_scheme", TypeTag::Enum(ConvectionScheme::NAMES))
            .enroll("nonortho_scheme", TypeTag::Enum(NonOrthoScheme::NAMES))
            .enroll("time_scheme", TypeTag::Enum(TimeScheme::NAMES))
            .enroll("runge_kutta", TypeTag::Int)
            .enroll("implicit_factor", TypeTag::Scalar)
            .enroll("blend_factor", TypeTag::Scalar)
            .enroll("method", TypeTag::Enum(Method::NAMES))
            .enroll("preconditioner", TypeTag::Enum(Preconditioner::NAMES))
            .enroll("tolerance", TypeTag::Scalar)
            .enroll("max_iterations", TypeTag::Int)
            .enroll("SOR_omega", TypeTag::Scalar)
            .enroll("parallel_method", TypeTag::Enum(ParallelMethod::NAMES))
            .enroll("probe", TypeTag::VectorList)
            .enroll("npx", TypeTag::Int)
            .enroll("npy", TypeTag::Int)
            .enroll("npz", TypeTag::Int)
            .enroll("rho", TypeTag::Scalar)
            .enroll("viscosity", TypeTag::Scalar)
            .enroll("conductivity", TypeTag::Scalar)
            .enroll("gravity", TypeTag::Vector);
        s
    }

    /// 从已切分的控制文件填充
    pub fn from_text(text: &ControlsText) -> Self {
        let vals = text.extract("general", &Self::schema());
        let mut c = Self::default();

        let geti = |key: &str, d: usize| -> usize {
            vals.get(key)
                .and_then(Value::as_int)
                .map(|v| v.max(0) as usize)
                .unwrap_or(d)
        };
        let gets = |key: &str, d: Scalar| vals.get(key).and_then(Value::as_scalar).unwrap_or(d);
        let gete = |key: &str| vals.get(key).and_then(Value::as_enum);

        if let Some(w) = vals.get("solver").and_then(Value::as_word) {
            c.solver = SolverKind::parse(w);
        }
        if let Some(w) = vals.get("mesh").and_then(Value::as_word) {
            c.mesh_name = w.to_string();
        }
        if let Some(i) = gete("state") {
            c.state = State::from_index(i);
        }
        c.dt = gets("dt", c.dt);
        c.start_step = geti("start_step", c.start_step);
        c.end_step = geti("end_step", c.end_step);
        c.write_interval = geti("write_interval", c.write_interval).max(1);
        if let Some(i) = gete("convection_scheme") {
            c.convection_scheme = ConvectionScheme::from_index(i);
        }
        if let Some(i) = gete("nonortho_scheme") {
            c.nonortho_scheme = NonOrthoScheme::from_index(i);
        }
        if let Some(i) = gete("time_scheme") {
            c.time_scheme = TimeScheme::from_index(i);
        }
        c.runge_kutta = geti("runge_kutta", c.runge_kutta);
        if c.runge_kutta > 1 && c.time_scheme != TimeScheme::Euler {
            log::warn!(
                "runge_kutta = {} 优先，忽略 time_scheme {:?}",
                c.runge_kutta,
                c.time_scheme
            );
        }
        c.implicit_factor = gets("implicit_factor", c.implicit_factor);
        c.blend_factor = gets("blend_factor", c.blend_factor);
        if let Some(i) = gete("method") {
            c.method = Method::from_index(i);
        }
        if let Some(i) = gete("preconditioner") {
            c.preconditioner = Preconditioner::from_index(i);
        }
        c.tolerance = gets("tolerance", c.tolerance);
        c.max_iterations = geti("max_iterations", c.max_iterations);
        c.sor_omega = gets("sor_omega", c.sor_omega);
        if let Some(i) = gete("parallel_method") {
            c.parallel_method = ParallelMethod::from_index(i);
        }
        if let Some(list) = vals.get("probe").and_then(Value::as_vector_list) {
            c.probe = list.to_vec();
        }
        c.npx = geti("npx", c.npx).max(1);
        c.npy = geti("npy", c.npy).max(1);
        c.npz = geti("npz", c.npz).max(1);
        c.general.rho = gets("rho", c.general.rho);
        c.general.viscosity = gets("viscosity", c.general.viscosity);
        c.general.conductivity = gets("conductivity", c.general.conductivity);
        if let Some(g) = vals.get("gravity").and_then(Value::as_vector) {
            c.general.gravity = g;
        }
        c
    }

    /// 是否稳态
    #[inline]
    pub fn steady(&self) -> bool {
        self.state == State::Steady
    }

    /// 写出步号（start_step 对齐到写出间隔）
    pub fn start_io_step(&self) -> usize {
        self.start_step / self.write_interval
    }

    /// 时间推进的第一步编号
    pub fn first_step(&self) -> usize {
        self.write_interval * self.start_io_step() + 1
    }
}
