// crates/fv_mesh/src/geometry.rs

//! 网格几何量推导
//!
//! 加载后执行一次 [`init_geom`]，计算：
//! - 面心 `fC`：扇形三角剖分的面积加权质心
//! - 面法向 `fN`：有向面积，模为面积，指向 owner → neighbor
//! - 单元中心 `cC` 与体积 `cV`：棱锥分解（散度定理）
//! - 面插值权重 `fI = |fC − nC| / (|fC − oC| + |fC − nC|)`
//!
//! 幽灵单元的中心取在面心处、体积取 owner 体积，
//! 因而边界面 `fI = 0`，面值即幽灵单元值（边界条件值）。

use fv_core::{Scalar, Vector};

use crate::topology::{interior_faces, Mesh};
use crate::MeshError;

/// 单元封闭性检查容差（相对面积）
const CLOSEDNESS_TOL: Scalar = 1e-8;

/// 推导全部几何量
///
/// 同时校验每个内部单元的有向面积闭合（Σ±fN ≈ 0），
/// 不闭合的网格直接报错而不是留给求解器发散。
pub fn init_geom(mesh: &mut Mesh) -> Result<(), MeshError> {
    let n_faces = mesh.n_faces();
    let n_cells = mesh.n_cells();
    let n_interior = mesh.ghost_cells_start();

    // ---- 面心与有向面积 ----
    let mut f_c = vec![Vector::ZERO; n_faces];
    let mut f_n = vec![Vector::ZERO; n_faces];

    for f in 0..n_faces {
        let verts = mesh.face_vertices(f);
        if verts.len() < 3 {
            return Err(MeshError::topology(format!("面 {} 顶点数不足", f)));
        }

        // 顶点平均作为扇形剖分的基准点
        let mut base = Vector::ZERO;
        for &v in verts {
            base += mesh.vertices()[v as usize];
        }
        base /= verts.len() as Scalar;

        // 三角形面积加权质心与法向累加
        let mut centroid = Vector::ZERO;
        let mut normal = Vector::ZERO;
        let mut area_sum = 0.0;
        for i in 0..verts.len() {
            let a = mesh.vertices()[verts[i] as usize];
            let b = mesh.vertices()[verts[(i + 1) % verts.len()] as usize];
            let tri_n = 0.5 * (a - base).cross(b - base);
            let tri_a = tri_n.length();
            let tri_c = (base + a + b) / 3.0;
            centroid += tri_c * tri_a;
            normal += tri_n;
            area_sum += tri_a;
        }

        f_c[f] = if area_sum > 0.0 {
            centroid / area_sum
        } else {
            base
        };
        f_n[f] = normal;
    }

    // ---- 单元中心与体积：棱锥分解 ----
    // 先以面心平均为临时顶点，再按棱锥体积加权修正质心。
    let mut c_c = vec![Vector::ZERO; n_cells];
    let mut c_v = vec![0.0 as Scalar; n_cells];

    for cell in 0..n_interior {
        let faces = mesh.faces_of(cell);
        let mut apex = Vector::ZERO;
        for &f in faces {
            apex += f_c[f as usize];
        }
        apex /= faces.len() as Scalar;

        let mut vol = 0.0;
        let mut centroid = Vector::ZERO;
        for &f in faces {
            let f = f as usize;
            let sign = if mesh.owner(f) == cell { 1.0 } else { -1.0 };
            // 棱锥体积 = fN·(fC − apex) / 3
            let pyr_vol = sign * f_n[f].dot(f_c[f] - apex) / 3.0;
            // 棱锥质心在底面心与顶点连线 3/4 处
            let pyr_c = apex + (f_c[f] - apex) * 0.75;
            vol += pyr_vol;
            centroid += pyr_c * pyr_vol;
        }

        if vol <= 0.0 {
            return Err(MeshError::topology(format!(
                "单元 {} 体积非正 ({:.3e})",
                cell, vol
            )));
        }
        c_v[cell] = vol;
        c_c[cell] = centroid / vol;
    }

    // 幽灵单元：中心在面心，体积取 owner
    for f in mesh.n_interior_faces()..n_faces {
        let ghost = mesh.ghost_of(f);
        c_c[ghost] = f_c[f];
        c_v[ghost] = c_v[mesh.owner(f)];
    }

    // ---- 封闭性校验 ----
    for cell in 0..n_interior {
        let mut sum = Vector::ZERO;
        let mut scale = 0.0;
        for &f in mesh.faces_of(cell) {
            let f = f as usize;
            let sign = if mesh.owner(f) == cell { 1.0 } else { -1.0 };
            sum += f_n[f] * sign;
            scale += f_n[f].length();
        }
        if sum.length() > CLOSEDNESS_TOL * scale.max(1.0) {
            return Err(MeshError::topology(format!(
                "单元 {} 有向面积不闭合 (|Σ±fN| = {:.3e})",
                cell,
                sum.length()
            )));
        }
    }

    // ---- 插值权重 ----
    let mut f_i = vec![0.0 as Scalar; n_faces];
    for f in interior_faces(mesh) {
        let d_o = (f_c[f] - c_c[mesh.owner(f)]).length();
        let d_n = (f_c[f] - c_c[mesh.neighbor(f)]).length();
        f_i[f] = d_n / (d_o + d_n);
    }
    // 边界面幽灵中心即面心，d_n = 0 ⇒ fI = 0，面值即幽灵值

    mesh.f_c = f_c;
    mesh.f_n = f_n;
    mesh.f_i = f_i;
    mesh.c_c = c_c;
    mesh.c_v = c_v;

    log::debug!(
        "网格 '{}' 几何推导完成: {} 单元 / {} 面 / {} 边界片",
        mesh.name,
        n_interior,
        n_faces,
        mesh.patches().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{structured_box, DEFAULT_PATCH_NAMES};

    fn unit_box(nx: usize, ny: usize, nz: usize) -> Mesh {
        structured_box(
            nx,
            ny,
            nz,
            Vector::ZERO,
            Vector::new(1.0, 1.0, 1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap()
    }

    #[test]
    fn test_unit_cell_volume() {
        let mesh = unit_box(1, 1, 1);
        assert!((mesh.c_v[0] - 1.0).abs() < 1e-12);
        assert!((mesh.c_c[0] - Vector::splat(0.5)).length() < 1e-12);
    }

    #[test]
    fn test_volumes_sum_to_domain() {
        let mesh = unit_box(4, 3, 2);
        let total: Scalar = mesh.c_v[..mesh.ghost_cells_start()].iter().sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_face_normals_closed() {
        // init_geom 内部已校验闭合性，这里验证数值上确实接近零
        let mesh = unit_box(3, 3, 3);
        for cell in 0..mesh.ghost_cells_start() {
            let mut sum = Vector::ZERO;
            for &f in mesh.faces_of(cell) {
                let f = f as usize;
                let sign = if mesh.owner(f) == cell { 1.0 } else { -1.0 };
                sum += mesh.f_n[f] * sign;
            }
            assert!(sum.length() < 1e-12);
        }
    }

    #[test]
    fn test_interpolation_weights() {
        let mesh = unit_box(2, 1, 1);
        // 均匀网格内部面权重为 0.5
        for f in 0..mesh.n_interior_faces() {
            assert!((mesh.f_i[f] - 0.5).abs() < 1e-12);
        }
        // 边界面权重为 0（面值即幽灵值）
        for f in mesh.n_interior_faces()..mesh.n_faces() {
            assert!(mesh.f_i[f].abs() < 1e-14);
            assert!((mesh.c_c[mesh.ghost_of(f)] - mesh.f_c[f]).length() < 1e-14);
        }
    }

    #[test]
    fn test_normal_orientation() {
        let mesh = unit_box(2, 1, 1);
        // 内部面法向指向 owner → neighbor
        for f in 0..mesh.n_interior_faces() {
            let d = mesh.face_delta(f);
            assert!(mesh.f_n[f].dot(d) > 0.0);
        }
        // 边界面法向指向域外（与 owner 中心到面心方向一致）
        for f in mesh.n_interior_faces()..mesh.n_faces() {
            let outward = mesh.f_c[f] - mesh.c_c[mesh.owner(f)];
            assert!(mesh.f_n[f].dot(outward) > 0.0);
        }
    }
}
