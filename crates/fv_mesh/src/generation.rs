// crates/fv_mesh/src/generation.rs

//! 结构化六面体网格生成
//!
//! 在长方体域上生成均匀六面体网格，面排布满足拓扑约定
//! （内部面在前、边界面按边界片分组连续）。
//! 测试与简单算例直接在内存中构造网格，无需网格文件。

use fv_core::{CellIndex, Vector};

use crate::topology::{CsrConnectivity, Mesh, Patch};
use crate::MeshError;

/// 默认边界片名称，按 xmin, xmax, ymin, ymax, zmin, zmax 排列
pub const DEFAULT_PATCH_NAMES: [&str; 6] = ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"];

/// 生成 nx × ny × nz 均匀盒网格
///
/// 单元编号 `i + nx*(j + ny*k)`，六个边界片按
/// `patch_names` 的顺序对应 xmin, xmax, ymin, ymax, zmin, zmax。
pub fn structured_box(
    nx: usize,
    ny: usize,
    nz: usize,
    lo: Vector,
    hi: Vector,
    patch_names: &[&str; 6],
) -> Result<Mesh, MeshError> {
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(MeshError::topology("网格维度不能为零"));
    }
    let d = (hi - lo) / Vector::new(nx as f64, ny as f64, nz as f64);

    // ---- 顶点 ----
    let vid = |i: usize, j: usize, k: usize| (i + (nx + 1) * (j + (ny + 1) * k)) as u32;
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(lo + Vector::new(i as f64 * d.x, j as f64 * d.y, k as f64 * d.z));
            }
        }
    }

    let cid = |i: usize, j: usize, k: usize| CellIndex::new(i + nx * (j + ny * k));

    let mut face_rows: Vec<Vec<u32>> = Vec::new();
    let mut owner = Vec::new();
    let mut neighbor = Vec::new();

    // ---- 内部面 ----
    // x 方向（法向 +x，owner 在 −x 侧）
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx - 1 {
                let x = i + 1;
                face_rows.push(vec![
                    vid(x, j, k),
                    vid(x, j + 1, k),
                    vid(x, j + 1, k + 1),
                    vid(x, j, k + 1),
                ]);
                owner.push(cid(i, j, k));
                neighbor.push(cid(i + 1, j, k));
            }
        }
    }
    // y 方向（法向 +y）
    for k in 0..nz {
        for j in 0..ny - 1 {
            for i in 0..nx {
                let y = j + 1;
                face_rows.push(vec![
                    vid(i, y, k),
                    vid(i, y, k + 1),
                    vid(i + 1, y, k + 1),
                    vid(i + 1, y, k),
                ]);
                owner.push(cid(i, j, k));
                neighbor.push(cid(i, j + 1, k));
            }
        }
    }
    // z 方向（法向 +z）
    for k in 0..nz - 1 {
        for j in 0..ny {
            for i in 0..nx {
                let z = k + 1;
                face_rows.push(vec![
                    vid(i, j, z),
                    vid(i + 1, j, z),
                    vid(i + 1, j + 1, z),
                    vid(i, j + 1, z),
                ]);
                owner.push(cid(i, j, k));
                neighbor.push(cid(i, j, k + 1));
            }
        }
    }

    // ---- 边界面（法向指向域外）----
    let mut patches = Vec::with_capacity(6);
    let mut push_patch = |name: &str,
                          face_rows: &mut Vec<Vec<u32>>,
                          owner: &mut Vec<CellIndex>,
                          neighbor: &mut Vec<CellIndex>,
                          gen: &mut dyn FnMut(&mut Vec<Vec<u32>>, &mut Vec<CellIndex>)| {
        let start = face_rows.len();
        gen(face_rows, owner);
        let count = face_rows.len() - start;
        neighbor.resize(face_rows.len(), CellIndex::invalid());
        patches.push(Patch {
            name: name.to_string(),
            start,
            count,
            neighbor_rank: processor_rank(name),
        });
    };

    // xmin（−x）
    push_patch(
        patch_names[0],
        &mut face_rows,
        &mut owner,
        &mut neighbor,
        &mut |rows, own| {
            for k in 0..nz {
                for j in 0..ny {
                    rows.push(vec![
                        vid(0, j, k),
                        vid(0, j, k + 1),
                        vid(0, j + 1, k + 1),
                        vid(0, j + 1, k),
                    ]);
                    own.push(cid(0, j, k));
                }
            }
        },
    );
    // xmax（+x）
    push_patch(
        patch_names[1],
        &mut face_rows,
        &mut owner,
        &mut neighbor,
        &mut |rows, own| {
            for k in 0..nz {
                for j in 0..ny {
                    rows.push(vec![
                        vid(nx, j, k),
                        vid(nx, j + 1, k),
                        vid(nx, j + 1, k + 1),
                        vid(nx, j, k + 1),
                    ]);
                    own.push(cid(nx - 1, j, k));
                }
            }
        },
    );
    // ymin（−y）
    push_patch(
        patch_names[2],
        &mut face_rows,
        &mut owner,
        &mut neighbor,
        &mut |rows, own| {
            for k in 0..nz {
                for i in 0..nx {
                    rows.push(vec![
                        vid(i, 0, k),
                        vid(i + 1, 0, k),
                        vid(i + 1, 0, k + 1),
                        vid(i, 0, k + 1),
                    ]);
                    own.push(cid(i, 0, k));
                }
            }
        },
    );
    // ymax（+y）
    push_patch(
        patch_names[3],
        &mut face_rows,
        &mut owner,
        &mut neighbor,
        &mut |rows, own| {
            for k in 0..nz {
                for i in 0..nx {
                    rows.push(vec![
                        vid(i, ny, k),
                        vid(i, ny, k + 1),
                        vid(i + 1, ny, k + 1),
                        vid(i + 1, ny, k),
                    ]);
                    own.push(cid(i, ny - 1, k));
                }
            }
        },
    );
    // zmin（−z）
    push_patch(
        patch_names[4],
        &mut face_rows,
        &mut owner,
        &mut neighbor,
        &mut |rows, own| {
            for j in 0..ny {
                for i in 0..nx {
                    rows.push(vec![
                        vid(i, j, 0),
                        vid(i, j + 1, 0),
                        vid(i + 1, j + 1, 0),
                        vid(i + 1, j, 0),
                    ]);
                    own.push(cid(i, j, 0));
                }
            }
        },
    );
    // zmax（+z）
    push_patch(
        patch_names[5],
        &mut face_rows,
        &mut owner,
        &mut neighbor,
        &mut |rows, own| {
            for j in 0..ny {
                for i in 0..nx {
                    rows.push(vec![
                        vid(i, j, nz),
                        vid(i + 1, j, nz),
                        vid(i + 1, j + 1, nz),
                        vid(i, j + 1, nz),
                    ]);
                    own.push(cid(i, j, nz - 1));
                }
            }
        },
    );

    let mut mesh = Mesh::from_raw(
        format!("box{}x{}x{}", nx, ny, nz),
        vertices,
        CsrConnectivity::from_rows(&face_rows),
        owner,
        neighbor,
        patches,
    )?;
    crate::geometry::init_geom(&mut mesh)?;
    Ok(mesh)
}

/// 从边界片名称解析进程间边界的对端 rank
///
/// 约定：`PROCESSOR<r>` 为与 rank r 相邻的进程间边界。
pub fn processor_rank(name: &str) -> Option<usize> {
    name.strip_prefix("PROCESSOR")
        .and_then(|s| s.parse::<usize>().ok())
}
