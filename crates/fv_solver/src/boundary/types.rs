// crates/fv_solver/src/boundary/types.rs

//! 边界条件类型与登记表

use std::collections::HashMap;

use fv_core::{FieldValue, Scalar, Vector};
use fv_mesh::Mesh;

// ============================================================
// 类型枚举
// ============================================================

/// 边界条件类型
///
/// 每种类型定义幽灵单元如何由相邻内部单元填充，以及
/// 对内部单元矩阵行的贡献方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BcKind {
    /// 固定值：幽灵值 = value
    #[default]
    Dirichlet,
    /// 固定梯度：幽灵值 = 内部值 + slope·|d|
    Neumann,
    /// 线性混合：shape·Dirichlet + (1−shape)·Neumann
    Robin,
    /// 对称：法向分量反射，切向不变
    Symmetry,
    /// 周期：幽灵值 = 配对面内部值，同片前后两半配对
    Cyclic,
    /// 湍动能壁面函数（近壁单元由 u* 决定，幽灵零梯度）
    CalcK,
    /// 耗散/比耗散壁面函数
    CalcX,
}

impl BcKind {
    /// 控制文件 / 场文件中的拼写
    pub const NAMES: &'static [&'static str] = &[
        "DIRICHLET",
        "NEUMANN",
        "ROBIN",
        "SYMMETRY",
        "CYCLIC",
        "CALC_K",
        "CALC_X",
    ];

    /// 类型名
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// 解析（大小写不敏感，未知回退 DIRICHLET 并告警）
    pub fn parse(word: &str) -> Self {
        const ALL: &[BcKind] = &[
            BcKind::Dirichlet,
            BcKind::Neumann,
            BcKind::Robin,
            BcKind::Symmetry,
            BcKind::Cyclic,
            BcKind::CalcK,
            BcKind::CalcX,
        ];
        match Self::NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(word))
        {
            Some(i) => ALL[i],
            None => {
                log::warn!("未知边界条件类型 '{}'，回退 DIRICHLET", word);
                BcKind::Dirichlet
            }
        }
    }

    /// 是否为湍流壁面函数类型
    pub fn is_wall_function(self) -> bool {
        matches!(self, Self::CalcK | Self::CalcX)
    }
}

// ============================================================
// 条目
// ============================================================

/// 场文件 boundary 块的一条说明（尚未绑定面索引）
#[derive(Debug, Clone)]
pub struct BcSpec<T: FieldValue> {
    /// 边界片名
    pub patch: String,
    /// 类型
    pub kind: BcKind,
    /// 固定值
    pub value: T,
    /// 梯度（Neumann / Robin）
    pub slope: T,
    /// Robin 混合因子 ∈ [0,1]
    pub shape: Scalar,
}

/// 已绑定面索引的边界条件
///
/// `init_indices` 之后不可变。
#[derive(Debug, Clone)]
pub struct BCondition<T: FieldValue> {
    /// 所属场名
    pub field: String,
    /// 边界片名
    pub patch: String,
    /// 类型
    pub kind: BcKind,
    /// 固定值
    pub value: T,
    /// 梯度
    pub slope: T,
    /// Robin 混合因子
    pub shape: Scalar,
    /// 边界片的面编号
    pub indices: Vec<usize>,
}

impl<T: FieldValue> BCondition<T> {
    /// 由说明与网格绑定面索引
    ///
    /// 边界片在网格中不存在时返回 None（记录警告）。
    pub fn init_indices(field: &str, spec: BcSpec<T>, mesh: &Mesh) -> Option<Self> {
        let Some(patch) = mesh.patch(&spec.patch) else {
            log::warn!("场 '{}' 的边界片 '{}' 不在网格中", field, spec.patch);
            return None;
        };
        Some(Self {
            field: field.to_string(),
            patch: spec.patch,
            kind: spec.kind,
            value: spec.value,
            slope: spec.slope,
            shape: spec.shape,
            indices: patch.faces().collect(),
        })
    }

    /// 还原为文件说明
    pub fn to_spec(&self) -> BcSpec<T> {
        BcSpec {
            patch: self.patch.clone(),
            kind: self.kind,
            value: self.value,
            slope: self.slope,
            shape: self.shape,
        }
    }
}

// ============================================================
// 登记表
// ============================================================

/// 进程级边界条件登记表
///
/// 以场名为键、按值类型分仓。启动阶段填充，时间推进循环内只读。
#[derive(Debug, Default)]
pub struct BcRegistry {
    scalar: HashMap<String, Vec<BCondition<Scalar>>>,
    vector: HashMap<String, Vec<BCondition<Vector>>>,
}

impl BcRegistry {
    /// 创建空登记表
    pub fn new() -> Self {
        Self::default()
    }

    /// 某场的全部边界条件
    pub fn of<T: BcValue>(&self, field: &str) -> &[BCondition<T>] {
        T::store(self).get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 登记一条边界条件（覆盖同 (场, 边界片) 旧条目）
    pub fn insert<T: BcValue>(&mut self, bc: BCondition<T>) {
        let list = T::store_mut(self).entry(bc.field.clone()).or_default();
        if let Some(old) = list
            .iter_mut()
            .find(|c| c.patch == bc.patch)
        {
            *old = bc;
        } else {
            list.push(bc);
        }
    }

    /// 移除某场的全部边界条件
    pub fn remove_field<T: BcValue>(&mut self, field: &str) {
        T::store_mut(self).remove(field);
    }

    /// 以说明列表整体登记一个场
    pub fn enroll_field<T: BcValue>(&mut self, field: &str, specs: Vec<BcSpec<T>>, mesh: &Mesh) {
        for spec in specs {
            if let Some(bc) = BCondition::init_indices(field, spec, mesh) {
                self.insert(bc);
            }
        }
    }
}

/// 可登记边界条件的值类型（标量与向量场）
pub trait BcValue: FieldValue {
    /// 登记表分仓（只读）
    fn store(reg: &BcRegistry) -> &HashMap<String, Vec<BCondition<Self>>>;
    /// 登记表分仓（可变）
    fn store_mut(reg: &mut BcRegistry) -> &mut HashMap<String, Vec<BCondition<Self>>>;
    /// 对称边界的反射
    fn reflect(self, n_unit: Vector) -> Self;
}

impl BcValue for Scalar {
    fn store(reg: &BcRegistry) -> &HashMap<String, Vec<BCondition<Self>>> {
        &reg.scalar
    }
    fn store_mut(reg: &mut BcRegistry) -> &mut HashMap<String, Vec<BCondition<Self>>> {
        &mut reg.scalar
    }
    #[inline]
    fn reflect(self, _n_unit: Vector) -> Self {
        self
    }
}

impl BcValue for Vector {
    fn store(reg: &BcRegistry) -> &HashMap<String, Vec<BCondition<Self>>> {
        &reg.vector
    }
    fn store_mut(reg: &mut BcRegistry) -> &mut HashMap<String, Vec<BCondition<Self>>> {
        &mut reg.vector
    }
    #[inline]
    fn reflect(self, n_unit: Vector) -> Self {
        self - n_unit * (2.0 * self.dot(n_unit))
    }
}
