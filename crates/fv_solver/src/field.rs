// crates/fv_solver/src/field.rs

//! 场容器与场代数
//!
//! [`Field<T>`] 是逐单元（含幽灵单元）或逐面的值数组，
//! 值类型由 [`FieldValue`] 约束（Scalar / Vector / Tensor / STensor）。
//!
//! # 生命周期
//!
//! 带名字构造的场参与步边界的文件读写（access 标记读/写），
//! 匿名场是纯临时量。场只借用网格拓扑，析构随作用域。
//!
//! # 文件格式
//!
//! 场文件 `<name><step>` 位于网格目录：
//!
//! ```text
//! field U
//! internal N {
//!   u v w
//!   ...
//! }
//! boundary M {
//!   patch KIND value... slope... shape
//! }
//! ```
//!
//! 每个值占 `N_COMP` 个数；boundary 块每行 value 与 slope 各
//! `N_COMP` 个数，末尾为 Robin 混合因子 shape。写后读回在
//! 文本精度内逐位一致（17 位有效数字往返）。

use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};
use std::path::Path;

use fv_core::{FieldValue, Scalar};
use fv_mesh::Mesh;

use crate::boundary::BcSpec;
use crate::SolverError;

/// 场的所在位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 单元场（长度 = 单元总数，含幽灵单元）
    Cell,
    /// 面场（长度 = 面总数）
    Face,
}

/// 步边界读写访问标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// 不参与文件读写
    #[default]
    None,
    /// 起始步读入
    Read,
    /// 写出步写出
    Write,
    /// 读入并写出
    ReadWrite,
}

impl Access {
    /// 是否读入
    #[inline]
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// 是否写出
    #[inline]
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// 单元 / 面场
#[derive(Debug, Clone)]
pub struct Field<T: FieldValue> {
    kind: FieldKind,
    data: Vec<T>,
    /// 读写访问标记
    pub access: Access,
    /// 持久名（匿名场为 None）
    pub name: Option<String>,
}

impl<T: FieldValue> Field<T> {
    /// 匿名单元场，初值 `init`
    pub fn cells(mesh: &Mesh, init: T) -> Self {
        Self {
            kind: FieldKind::Cell,
            data: vec![init; mesh.n_cells()],
            access: Access::None,
            name: None,
        }
    }

    /// 匿名面场，初值 `init`
    pub fn faces(mesh: &Mesh, init: T) -> Self {
        Self {
            kind: FieldKind::Face,
            data: vec![init; mesh.n_faces()],
            access: Access::None,
            name: None,
        }
    }

    /// 带名字的单元场（参与步边界文件读写）
    pub fn named(name: impl Into<String>, access: Access, mesh: &Mesh) -> Self {
        Self {
            kind: FieldKind::Cell,
            data: vec![T::ZERO; mesh.n_cells()],
            access,
            name: Some(name.into()),
        }
    }

    /// 所在位置
    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// 长度
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 只读切片
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// 可变切片
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// 迭代器
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// 全场置值
    pub fn fill(&mut self, v: T) {
        self.data.fill(v);
    }

    /// 从另一场拷贝值（形状必须一致）
    pub fn assign(&mut self, other: &Self) {
        debug_assert_eq!(self.len(), other.len());
        self.data.copy_from_slice(&other.data);
    }

    /// 欠松弛更新: self = old + α (self − old)
    pub fn relax(&mut self, old: &Self, alpha: Scalar) {
        debug_assert_eq!(self.len(), old.len());
        for (v, o) in self.data.iter_mut().zip(old.data.iter()) {
            *v = *o + (*v - *o) * alpha;
        }
    }

    /// 逐元素模，返回标量场
    pub fn mag(&self) -> Field<Scalar> {
        Field {
            kind: self.kind,
            data: self.data.iter().map(|v| v.mag()).collect(),
            access: Access::None,
            name: None,
        }
    }

    /// 逐分量平方根
    pub fn sqrt_comp(&self) -> Self {
        Field {
            kind: self.kind,
            data: self.data.iter().map(|v| v.sqrt_comp()).collect(),
            access: Access::None,
            name: None,
        }
    }

    /// 以标量场逐元素缩放
    pub fn scaled_by(&self, s: &Field<Scalar>) -> Self {
        debug_assert_eq!(self.len(), s.len());
        Field {
            kind: self.kind,
            data: self
                .data
                .iter()
                .zip(s.data.iter())
                .map(|(v, s)| *v * *s)
                .collect(),
            access: Access::None,
            name: None,
        }
    }

    /// 内部单元是否全部有限
    pub fn all_finite(&self, n_interior: usize) -> bool {
        self.data[..n_interior.min(self.data.len())]
            .iter()
            .all(|v| v.is_finite_all())
    }
}

impl<T: FieldValue> Index<usize> for Field<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T: FieldValue> IndexMut<usize> for Field<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

// ============================================================
// 场代数（产生匿名临时场）
// ============================================================

macro_rules! zip_op {
    ($lhs:expr, $rhs:expr, $op:tt) => {{
        debug_assert_eq!($lhs.len(), $rhs.len());
        Field {
            kind: $lhs.kind,
            data: $lhs
                .data
                .iter()
                .zip($rhs.data.iter())
                .map(|(a, b)| *a $op *b)
                .collect(),
            access: Access::None,
            name: None,
        }
    }};
}

impl<T: FieldValue> Add for &Field<T> {
    type Output = Field<T>;
    fn add(self, rhs: Self) -> Field<T> {
        zip_op!(self, rhs, +)
    }
}

impl<T: FieldValue> Sub for &Field<T> {
    type Output = Field<T>;
    fn sub(self, rhs: Self) -> Field<T> {
        zip_op!(self, rhs, -)
    }
}

/// 逐分量乘（LES 统计 U*U 等）
impl<T: FieldValue> Mul for &Field<T> {
    type Output = Field<T>;
    fn mul(self, rhs: Self) -> Field<T> {
        zip_op!(self, rhs, *)
    }
}

impl<T: FieldValue> Neg for &Field<T> {
    type Output = Field<T>;
    fn neg(self) -> Field<T> {
        Field {
            kind: self.kind,
            data: self.data.iter().map(|v| -*v).collect(),
            access: Access::None,
            name: None,
        }
    }
}

impl<T: FieldValue> Mul<Scalar> for &Field<T> {
    type Output = Field<T>;
    fn mul(self, s: Scalar) -> Field<T> {
        Field {
            kind: self.kind,
            data: self.data.iter().map(|v| *v * s).collect(),
            access: Access::None,
            name: None,
        }
    }
}

impl<T: FieldValue> Div<Scalar> for &Field<T> {
    type Output = Field<T>;
    fn div(self, s: Scalar) -> Field<T> {
        Field {
            kind: self.kind,
            data: self.data.iter().map(|v| *v / s).collect(),
            access: Access::None,
            name: None,
        }
    }
}

impl<T: FieldValue> AddAssign<&Field<T>> for Field<T> {
    fn add_assign(&mut self, rhs: &Field<T>) {
        debug_assert_eq!(self.len(), rhs.len());
        for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a += *b;
        }
    }
}

impl<T: FieldValue> SubAssign<&Field<T>> for Field<T> {
    fn sub_assign(&mut self, rhs: &Field<T>) {
        debug_assert_eq!(self.len(), rhs.len());
        for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a -= *b;
        }
    }
}

// ============================================================
// 文件读写
// ============================================================

/// 场文件内容：内部值 + 边界条件说明
#[derive(Debug, Clone)]
pub struct FieldFile<T: FieldValue> {
    /// 内部单元值
    pub internal: Vec<T>,
    /// 边界条件说明（按边界片）
    pub bcs: Vec<BcSpec<T>>,
}

impl<T: FieldValue> Field<T> {
    /// 从网格目录读取 `<name><step>` 场文件
    ///
    /// 内部值写入场，边界块解析为 [`BcSpec`] 交由调用方登记。
    /// 文件缺失是致命错误（规约：请求步的场文件必须存在）。
    pub fn read_file(
        &mut self,
        dir: &Path,
        step: usize,
        mesh: &Mesh,
    ) -> Result<Vec<BcSpec<T>>, SolverError> {
        let name = self.name.as_deref().unwrap_or_default();
        let path = dir.join(format!("{}{}", name, step));
        let text = std::fs::read_to_string(&path)
            .map_err(|_| SolverError::FieldFileMissing(path.clone()))?;

        let file = parse_field_file::<T>(&text, &path)?;
        if file.internal.len() != mesh.ghost_cells_start() {
            return Err(SolverError::SizeMismatch {
                expected: mesh.ghost_cells_start(),
                actual: file.internal.len(),
            });
        }
        self.data[..file.internal.len()].copy_from_slice(&file.internal);
        Ok(file.bcs)
    }

    /// 写出到网格目录的 `<name><step>`
    ///
    /// 只写内部单元值与边界条件说明；17 位有效数字保证
    /// 写后读回逐位一致。
    pub fn write_file(
        &self,
        dir: &Path,
        step: usize,
        mesh: &Mesh,
        bcs: &[BcSpec<T>],
    ) -> Result<(), SolverError> {
        use std::fmt::Write as _;

        let name = self.name.as_deref().unwrap_or_default();
        let path = dir.join(format!("{}{}", name, step));
        let n = mesh.ghost_cells_start();

        let mut out = String::new();
        let _ = writeln!(out, "field {}", name);
        let _ = writeln!(out, "internal {} {{", n);
        for v in &self.data[..n] {
            for c in 0..T::N_COMP {
                let _ = write!(out, "{:.17e} ", v.comp(c));
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "}}");
        let _ = writeln!(out, "boundary {} {{", bcs.len());
        for bc in bcs {
            let _ = write!(out, "{} {} ", bc.patch, bc.kind.name());
            for c in 0..T::N_COMP {
                let _ = write!(out, "{:.17e} ", bc.value.comp(c));
            }
            for c in 0..T::N_COMP {
                let _ = write!(out, "{:.17e} ", bc.slope.comp(c));
            }
            let _ = writeln!(out, "{:.17e}", bc.shape);
        }
        let _ = writeln!(out, "}}");

        std::fs::write(&path, out).map_err(|source| SolverError::FieldWrite { path, source })
    }
}

/// 场文件 token 流
struct FieldTokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
    path: &'a Path,
}

impl<'a> FieldTokens<'a> {
    fn next(&mut self, what: &str) -> Result<&'a str, SolverError> {
        self.iter.next().ok_or_else(|| {
            SolverError::field_format(self.path, format!("提前结束，期望 {}", what))
        })
    }

    fn keyword(&mut self, kw: &str) -> Result<(), SolverError> {
        let t = self.next(kw)?;
        if t.eq_ignore_ascii_case(kw) {
            Ok(())
        } else {
            Err(SolverError::field_format(
                self.path,
                format!("期望 '{}' 实际 '{}'", kw, t),
            ))
        }
    }

    fn symbol(&mut self, sym: &str) -> Result<(), SolverError> {
        let t = self.next(sym)?;
        if t == sym {
            Ok(())
        } else {
            Err(SolverError::field_format(
                self.path,
                format!("期望 '{}' 实际 '{}'", sym, t),
            ))
        }
    }

    fn usize(&mut self, what: &str) -> Result<usize, SolverError> {
        let t = self.next(what)?;
        t.parse()
            .map_err(|_| SolverError::field_format(self.path, format!("{} 不是整数", what)))
    }

    fn scalar(&mut self, what: &str) -> Result<Scalar, SolverError> {
        let t = self.next(what)?;
        t.parse()
            .map_err(|_| SolverError::field_format(self.path, format!("{} 非法数值 '{}'", what, t)))
    }

    fn value<T: FieldValue>(&mut self, what: &str) -> Result<T, SolverError> {
        let mut v = T::ZERO;
        for c in 0..T::N_COMP {
            v.set_comp(c, self.scalar(what)?);
        }
        Ok(v)
    }
}

/// 解析场文件文本
pub fn parse_field_file<T: FieldValue>(
    text: &str,
    path: &Path,
) -> Result<FieldFile<T>, SolverError> {
    let mut tok = FieldTokens {
        iter: text.split_whitespace(),
        path,
    };

    tok.keyword("field")?;
    let _name = tok.next("场名")?;

    tok.keyword("internal")?;
    let n = tok.usize("内部值个数")?;
    tok.symbol("{")?;
    let mut internal = Vec::with_capacity(n);
    for _ in 0..n {
        internal.push(tok.value::<T>("分量")?);
    }
    tok.symbol("}")?;

    tok.keyword("boundary")?;
    let m = tok.usize("边界条数")?;
    tok.symbol("{")?;
    let mut bcs = Vec::with_capacity(m);
    for _ in 0..m {
        let patch = tok.next("边界片名")?.to_string();
        let kind = crate::boundary::BcKind::parse(tok.next("边界条件类型")?);
        let value = tok.value::<T>("边界值")?;
        let slope = tok.value::<T>("边界斜率")?;
        let shape = tok.scalar("shape")?;
        bcs.push(BcSpec {
            patch,
            kind,
            value,
            slope,
            shape,
        });
    }
    tok.symbol("}")?;

    Ok(FieldFile { internal, bcs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::Vector;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn mesh() -> Mesh {
        structured_box(
            2,
            2,
            1,
            Vector::ZERO,
            Vector::new(1.0, 1.0, 1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap()
    }

    #[test]
    fn test_field_arithmetic() {
        let m = mesh();
        let mut a = Field::<Scalar>::cells(&m, 2.0);
        let b = Field::<Scalar>::cells(&m, 3.0);

        let c = &a + &b;
        assert!((c[0] - 5.0).abs() < 1e-14);
        let d = &a * &b;
        assert!((d[0] - 6.0).abs() < 1e-14);
        let e = &a * 2.0;
        assert!((e[0] - 4.0).abs() < 1e-14);
        a += &b;
        assert!((a[0] - 5.0).abs() < 1e-14);
    }

    #[test]
    fn test_field_relax() {
        let m = mesh();
        let old = Field::<Scalar>::cells(&m, 1.0);
        let mut f = Field::<Scalar>::cells(&m, 2.0);
        f.relax(&old, 0.5);
        // 1 + 0.5*(2-1) = 1.5
        assert!((f[0] - 1.5).abs() < 1e-14);
    }

    #[test]
    fn test_scaled_by() {
        let m = mesh();
        let u = Field::<Vector>::cells(&m, Vector::new(2.0, 4.0, 6.0));
        let s = Field::<Scalar>::cells(&m, 0.5);
        let r = u.scaled_by(&s);
        assert!((r[0] - Vector::new(1.0, 2.0, 3.0)).length() < 1e-14);
    }

    #[test]
    fn test_file_round_trip() {
        let m = mesh();
        let dir = std::env::temp_dir().join("fvflow_field_test");
        std::fs::create_dir_all(&dir).unwrap();

        let mut u = Field::<Vector>::named("U", Access::ReadWrite, &m);
        for i in 0..m.ghost_cells_start() {
            u[i] = Vector::new(i as f64 * 0.1, -(i as f64), 1.0 / (i as f64 + 1.0));
        }
        let bcs = vec![BcSpec {
            patch: "xmin".to_string(),
            kind: crate::boundary::BcKind::Dirichlet,
            value: Vector::new(1.0, 0.0, 0.0),
            slope: Vector::ZERO,
            shape: 0.0,
        }];
        u.write_file(&dir, 7, &m, &bcs).unwrap();

        let mut v = Field::<Vector>::named("U", Access::Read, &m);
        let read_bcs = v.read_file(&dir, 7, &m).unwrap();

        // 写后读回逐位一致
        for i in 0..m.ghost_cells_start() {
            assert_eq!(u[i], v[i]);
        }
        assert_eq!(read_bcs.len(), 1);
        assert_eq!(read_bcs[0].patch, "xmin");
        assert_eq!(read_bcs[0].kind, crate::boundary::BcKind::Dirichlet);
        assert_eq!(read_bcs[0].value, Vector::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_field_file_is_fatal() {
        let m = mesh();
        let mut u = Field::<Scalar>::named("nonexistent", Access::Read, &m);
        let err = u
            .read_file(Path::new("/tmp/fvflow_no_such_dir"), 0, &m)
            .unwrap_err();
        assert!(matches!(err, SolverError::FieldFileMissing(_)));
    }
}
