// crates/fv_mesh/src/topology.rs

//! 网格拓扑数据结构
//!
//! 非结构化同位网格的连接关系，CSR (Compressed Sparse Row) 格式存储。
//!
//! # 约定
//!
//! - 面按编号升序排列：内部面在前 `[0, n_interior_faces)`，
//!   边界面在后，并按边界片（patch）分组连续存放。
//! - 每个边界面镜像一个幽灵单元（ghost cell），编号从
//!   `ghost_cells_start()` 起与边界面一一对应；边界面的 neighbor
//!   即为其幽灵单元。
//! - 内部面满足 `owner < neighbor < ghost_cells_start`。
//! - 组装循环按面编号升序访问；单元内按网格存储顺序访问其面。
//!   该顺序是残差序列可复现的前提，实现不得改变。
//!
//! # 并行
//!
//! 名称以 `PROCESSOR` 开头的边界片是进程间边界，后缀为对端
//! rank 编号；其幽灵单元由 halo 交换填充而非边界条件。

use fv_core::{CellIndex, Scalar, Vector};
use std::collections::HashMap;

use crate::MeshError;

/// CSR 格式连接性
///
/// `offsets[i]..offsets[i+1]` 之间的元素是第 i 行的条目。
/// 内存紧凑、缓存友好，适合只读迭代。
#[derive(Debug, Clone, Default)]
pub struct CsrConnectivity {
    offsets: Vec<usize>,
    indices: Vec<u32>,
}

impl CsrConnectivity {
    /// 从行偏移与索引数组创建
    pub fn new(offsets: Vec<usize>, indices: Vec<u32>) -> Self {
        debug_assert!(!offsets.is_empty());
        debug_assert_eq!(*offsets.last().unwrap(), indices.len());
        Self { offsets, indices }
    }

    /// 从每行的条目列表构建
    pub fn from_rows(rows: &[Vec<u32>]) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        offsets.push(0);
        for row in rows {
            indices.extend_from_slice(row);
            offsets.push(indices.len());
        }
        Self { offsets, indices }
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// 第 row 行的条目
    #[inline]
    pub fn row(&self, row: usize) -> &[u32] {
        &self.indices[self.offsets[row]..self.offsets[row + 1]]
    }

    /// 条目总数
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// 边界片
///
/// 名称到连续边界面区间的映射。
#[derive(Debug, Clone)]
pub struct Patch {
    /// 边界片名称
    pub name: String,
    /// 区间起始面编号
    pub start: usize,
    /// 面数量
    pub count: usize,
    /// 进程间边界的对端 rank（非进程间边界为 None）
    pub neighbor_rank: Option<usize>,
}

impl Patch {
    /// 区间内的面编号迭代器
    #[inline]
    pub fn faces(&self) -> impl Iterator<Item = usize> + '_ {
        self.start..self.start + self.count
    }

    /// 是否为进程间边界
    #[inline]
    pub fn is_processor(&self) -> bool {
        self.neighbor_rank.is_some()
    }
}

/// 非结构化网格
///
/// 加载后不可变。几何量（面心、面法向、单元中心、体积、插值权重）
/// 由 [`crate::geometry::init_geom`] 一次性推导。
#[derive(Debug, Clone)]
pub struct Mesh {
    /// 网格名称（即网格目录名）
    pub name: String,

    // ---- 拓扑 ----
    vertices: Vec<Vector>,
    face_verts: CsrConnectivity,
    face_owner: Vec<CellIndex>,
    face_neighbor: Vec<CellIndex>,
    cell_faces: CsrConnectivity,
    patches: Vec<Patch>,
    patch_lookup: HashMap<String, usize>,
    n_interior_cells: usize,
    n_interior_faces: usize,

    // ---- 几何（init_geom 填充）----
    /// 面心
    pub f_c: Vec<Vector>,
    /// 面法向（模为面积，指向 owner → neighbor）
    pub f_n: Vec<Vector>,
    /// 面插值权重 fI ∈ [0,1]
    pub f_i: Vec<Scalar>,
    /// 单元中心（含幽灵单元）
    pub c_c: Vec<Vector>,
    /// 单元体积（含幽灵单元）
    pub c_v: Vec<Scalar>,
}

impl Mesh {
    /// 从原始拓扑数据构造
    ///
    /// `face_neighbor` 中边界面用 `CellIndex::invalid()` 标记，
    /// 构造时重定向到对应幽灵单元。几何量尚未推导，
    /// 调用方必须随后执行 [`crate::geometry::init_geom`]。
    pub fn from_raw(
        name: String,
        vertices: Vec<Vector>,
        face_verts: CsrConnectivity,
        face_owner: Vec<CellIndex>,
        mut face_neighbor: Vec<CellIndex>,
        patches: Vec<Patch>,
    ) -> Result<Self, MeshError> {
        let n_faces = face_owner.len();
        if face_neighbor.len() != n_faces || face_verts.n_rows() != n_faces {
            return Err(MeshError::topology("面数组长度不一致"));
        }

        // 内部面区间与单元数
        let n_interior_faces = face_neighbor.iter().filter(|n| n.is_valid()).count();
        let mut n_interior_cells = 0usize;
        for f in 0..n_faces {
            let o = face_owner[f].get();
            n_interior_cells = n_interior_cells.max(o + 1);
            if let Some(n) = face_neighbor[f].checked() {
                n_interior_cells = n_interior_cells.max(n + 1);
                if f >= n_interior_faces {
                    return Err(MeshError::topology("内部面必须排在边界面之前"));
                }
                if o >= n {
                    return Err(MeshError::topology(format!(
                        "内部面 {} 违反 owner < neighbor ({} >= {})",
                        f, o, n
                    )));
                }
            }
        }

        // 边界面的 neighbor 重定向到幽灵单元
        for f in n_interior_faces..n_faces {
            if face_neighbor[f].is_valid() {
                return Err(MeshError::topology("边界面区间内出现内部面"));
            }
            let ghost = n_interior_cells + (f - n_interior_faces);
            face_neighbor[f] = CellIndex::new(ghost);
        }

        // 校验边界片区间覆盖全部边界面
        let n_boundary = n_faces - n_interior_faces;
        let covered: usize = patches.iter().map(|p| p.count).sum();
        if covered != n_boundary {
            return Err(MeshError::topology(format!(
                "边界片覆盖 {} 个面，但边界面共 {} 个",
                covered, n_boundary
            )));
        }

        // 单元-面映射（访问顺序即存储顺序）
        let mut rows: Vec<Vec<u32>> = vec![Vec::new(); n_interior_cells];
        for f in 0..n_faces {
            rows[face_owner[f].get()].push(f as u32);
            if let Some(n) = face_neighbor[f].checked() {
                if n < n_interior_cells {
                    rows[n].push(f as u32);
                }
            }
        }
        let cell_faces = CsrConnectivity::from_rows(&rows);

        let patch_lookup = patches
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();

        Ok(Self {
            name,
            vertices,
            face_verts,
            face_owner,
            face_neighbor,
            cell_faces,
            patches,
            patch_lookup,
            n_interior_cells,
            n_interior_faces,
            f_c: Vec::new(),
            f_n: Vec::new(),
            f_i: Vec::new(),
            c_c: Vec::new(),
            c_v: Vec::new(),
        })
    }

    // ---- 规模查询 ----

    /// 单元总数（含幽灵单元）
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_interior_cells + self.n_boundary_faces()
    }

    /// 内部单元数，即幽灵单元起始编号 (gBCellsStart)
    #[inline]
    pub fn ghost_cells_start(&self) -> usize {
        self.n_interior_cells
    }

    /// 面总数
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.face_owner.len()
    }

    /// 内部面数
    #[inline]
    pub fn n_interior_faces(&self) -> usize {
        self.n_interior_faces
    }

    /// 边界面数
    #[inline]
    pub fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_interior_faces
    }

    /// 顶点数组
    #[inline]
    pub fn vertices(&self) -> &[Vector] {
        &self.vertices
    }

    /// 面的顶点环
    #[inline]
    pub fn face_vertices(&self, face: usize) -> &[u32] {
        self.face_verts.row(face)
    }

    // ---- 拓扑查询 ----

    /// 面的 owner 单元
    #[inline]
    pub fn owner(&self, face: usize) -> usize {
        self.face_owner[face].get()
    }

    /// 面的 neighbor 单元（边界面为幽灵单元）
    #[inline]
    pub fn neighbor(&self, face: usize) -> usize {
        self.face_neighbor[face].get()
    }

    /// 是否为边界面
    #[inline]
    pub fn is_boundary(&self, face: usize) -> bool {
        face >= self.n_interior_faces
    }

    /// 单元的面列表
    #[inline]
    pub fn faces_of(&self, cell: usize) -> &[u32] {
        self.cell_faces.row(cell)
    }

    /// 面上与 cell 相对的另一侧单元
    #[inline]
    pub fn opposite(&self, face: usize, cell: usize) -> usize {
        let o = self.owner(face);
        if o == cell {
            self.neighbor(face)
        } else {
            o
        }
    }

    /// cell 在面上的侧别：owner 侧为 0，neighbor 侧为 1
    #[inline]
    pub fn side(&self, face: usize, cell: usize) -> usize {
        if self.owner(face) == cell {
            0
        } else {
            1
        }
    }

    /// 边界面对应的幽灵单元
    #[inline]
    pub fn ghost_of(&self, face: usize) -> usize {
        debug_assert!(self.is_boundary(face));
        self.n_interior_cells + (face - self.n_interior_faces)
    }

    /// 幽灵单元对应的边界面
    #[inline]
    pub fn face_of_ghost(&self, ghost: usize) -> usize {
        debug_assert!(ghost >= self.n_interior_cells);
        self.n_interior_faces + (ghost - self.n_interior_cells)
    }

    // ---- 边界片查询 ----

    /// 边界片列表
    #[inline]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// 按名称查找边界片
    pub fn patch(&self, name: &str) -> Option<&Patch> {
        self.patch_lookup.get(name).map(|&i| &self.patches[i])
    }

    /// 面所属的边界片
    pub fn patch_of(&self, face: usize) -> Option<&Patch> {
        if !self.is_boundary(face) {
            return None;
        }
        self.patches
            .iter()
            .find(|p| face >= p.start && face < p.start + p.count)
    }

    /// 距 point 最近的内部单元
    ///
    /// 探针点定位用，线性扫描。
    pub fn find_nearest(&self, point: Vector) -> usize {
        let mut best = 0;
        let mut best_d = Scalar::MAX;
        for c in 0..self.n_interior_cells {
            let d = (self.c_c[c] - point).length_squared();
            if d < best_d {
                best_d = d;
                best = c;
            }
        }
        best
    }

    // ---- 几何便捷查询 ----

    /// owner 到 neighbor 的中心连线 d_f = nC − oC
    #[inline]
    pub fn face_delta(&self, face: usize) -> Vector {
        self.c_c[self.neighbor(face)] - self.c_c[self.owner(face)]
    }

    /// 面积模
    #[inline]
    pub fn face_area(&self, face: usize) -> Scalar {
        self.f_n[face].length()
    }
}

/// 便捷别名：面编号迭代器
pub fn interior_faces(mesh: &Mesh) -> std::ops::Range<usize> {
    0..mesh.n_interior_faces()
}

/// 便捷别名：边界面编号迭代器
pub fn boundary_faces(mesh: &Mesh) -> std::ops::Range<usize> {
    mesh.n_interior_faces()..mesh.n_faces()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_rows() {
        let csr = CsrConnectivity::new(vec![0, 3, 7, 9], vec![0, 1, 2, 1, 2, 3, 4, 2, 3]);
        assert_eq!(csr.row(0), &[0, 1, 2]);
        assert_eq!(csr.row(1), &[1, 2, 3, 4]);
        assert_eq!(csr.n_rows(), 3);
        assert_eq!(csr.len(), 9);
    }

    #[test]
    fn test_csr_from_rows() {
        let rows = vec![vec![5, 6], vec![], vec![7]];
        let csr = CsrConnectivity::from_rows(&rows);
        assert_eq!(csr.row(0), &[5, 6]);
        assert!(csr.row(1).is_empty());
        assert_eq!(csr.row(2), &[7]);
    }

    #[test]
    fn test_structured_box_topology() {
        // 2x1x1 盒网格: 2 个内部单元, 1 个内部面, 10 个边界面
        let mesh = crate::generation::structured_box(
            2,
            1,
            1,
            Vector::ZERO,
            Vector::new(2.0, 1.0, 1.0),
            &crate::generation::DEFAULT_PATCH_NAMES,
        )
        .unwrap();

        assert_eq!(mesh.ghost_cells_start(), 2);
        assert_eq!(mesh.n_interior_faces(), 1);
        assert_eq!(mesh.n_boundary_faces(), 10);
        assert_eq!(mesh.n_cells(), 12);

        // 内部面 owner < neighbor
        assert!(mesh.owner(0) < mesh.neighbor(0));
        assert!(mesh.neighbor(0) < mesh.ghost_cells_start());

        // 边界面 neighbor 为幽灵单元
        let bf = mesh.n_interior_faces();
        assert!(mesh.neighbor(bf) >= mesh.ghost_cells_start());
        assert_eq!(mesh.ghost_of(bf), mesh.neighbor(bf));
        assert_eq!(mesh.face_of_ghost(mesh.ghost_of(bf)), bf);
    }

    #[test]
    fn test_opposite_and_side() {
        let mesh = crate::generation::structured_box(
            2,
            1,
            1,
            Vector::ZERO,
            Vector::new(2.0, 1.0, 1.0),
            &crate::generation::DEFAULT_PATCH_NAMES,
        )
        .unwrap();
        let f = 0; // 内部面
        let o = mesh.owner(f);
        let n = mesh.neighbor(f);
        assert_eq!(mesh.opposite(f, o), n);
        assert_eq!(mesh.opposite(f, n), o);
        assert_eq!(mesh.side(f, o), 0);
        assert_eq!(mesh.side(f, n), 1);
    }

    #[test]
    fn test_patch_lookup() {
        let mesh = crate::generation::structured_box(
            2,
            2,
            1,
            Vector::ZERO,
            Vector::new(1.0, 1.0, 1.0),
            &["west", "east", "south", "north", "bottom", "top"],
        )
        .unwrap();
        let west = mesh.patch("west").unwrap();
        assert_eq!(west.count, 2);
        for f in west.faces() {
            assert!(mesh.is_boundary(f));
            assert_eq!(mesh.patch_of(f).unwrap().name, "west");
        }
        assert!(mesh.patch("nonexistent").is_none());
    }
}
