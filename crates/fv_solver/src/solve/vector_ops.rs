// crates/fv_solver/src/solve/vector_ops.rs

//! 求解器向量原语
//!
//! 工作向量为内部单元上的 `Vec<T>`；内积对分量求和，
//! 累加按单元编号升序（固定 rank 数下逐位可复现），
//! 全局归约由调用方经通信门面完成。

use fv_core::{FieldValue, Scalar};

/// 本地内积（未归约）
#[inline]
pub fn dot_local<T: FieldValue>(a: &[T], b: &[T]) -> Scalar {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0;
    for i in 0..a.len() {
        sum += a[i].inner(&b[i]);
    }
    sum
}

/// y += alpha * x
#[inline]
pub fn axpy<T: FieldValue>(alpha: Scalar, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    for i in 0..x.len() {
        y[i] += x[i] * alpha;
    }
}

/// dst = src
#[inline]
pub fn copy<T: FieldValue>(src: &[T], dst: &mut [T]) {
    dst.copy_from_slice(src);
}
