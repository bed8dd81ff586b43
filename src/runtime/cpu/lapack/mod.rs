//! CPU implementations of the batched factorization drivers
//!
//! Every driver follows the same shape: validate values, then sizes, then
//! buffers; check the workspace against the sizing oracle; quick-return on
//! empty problems; materialize raw descriptors (batched-layout base pointers
//! land in the pointer-array region); then run a fixed sequence of batched
//! kernels from [`blas`](super::blas). The `*_body` functions carry the
//! kernel sequences and compose through shifted descriptor views, which is
//! how the blocked drivers reuse the unblocked panels.

mod geblt;
mod gelq;
mod geqr;
mod getf2;
mod getrf;
mod getrs;
mod larf;
mod larfb;
mod larft;
mod ormbr;
mod ormlq;
mod ormqr;

use super::client::CpuClient;
use crate::batch::{Layout, MatrixBatchMut, VecBatchMut};
use crate::dtype::{Element, Scalar};
use crate::error::{Error, Result};
use crate::lapack::{
    BlockConfig, Direction, Lapack, Operation, Side, StorageMode, Workspace, WorkspaceReq,
};

/// Geometry sanity shared by every matrix operand: a positive row increment,
/// a leading dimension long enough that columns do not overlap, and batch
/// instances that address disjoint memory (kernels mutate instances in
/// parallel)
fn check_geometry<T: Element>(arg: &'static str, m: &MatrixBatchMut<'_, T>) -> Result<()> {
    if m.inca() == 0 {
        return Err(Error::invalid_size(arg, "row increment must be at least 1"));
    }
    if m.rows() > 0 && m.lda() < m.rows() * m.inca() {
        return Err(Error::invalid_size(
            arg,
            "leading dimension shorter than a column",
        ));
    }
    if !m.instances_disjoint() {
        return Err(Error::invalid_size(arg, "batch instances overlap in memory"));
    }
    Ok(())
}

/// All matrix operands of one call must share a storage layout and a batch
/// count; the first entry is the reference
fn check_batch_uniform(ops: &[(&'static str, Layout, usize)]) -> Result<()> {
    let (_, layout0, bc0) = ops[0];
    for &(arg, layout, bc) in &ops[1..] {
        if layout != layout0 {
            return Err(Error::invalid_value(arg, "storage layout mismatch"));
        }
        if bc != bc0 {
            return Err(Error::invalid_size(arg, "batch count mismatch"));
        }
    }
    Ok(())
}

fn check_capacity<T: Element>(arg: &'static str, m: &MatrixBatchMut<'_, T>) -> Result<()> {
    if m.has_capacity() {
        Ok(())
    } else {
        Err(Error::invalid_pointer(arg))
    }
}

fn check_vec_capacity<S: Copy>(
    arg: &'static str,
    v: &VecBatchMut<'_, S>,
    count: usize,
    batch_count: usize,
) -> Result<()> {
    if v.has_capacity(count, batch_count) {
        Ok(())
    } else {
        Err(Error::invalid_pointer(arg))
    }
}

fn check_info(info: &[i32], batch_count: usize) -> Result<()> {
    if info.len() < batch_count {
        return Err(Error::invalid_pointer("info"));
    }
    Ok(())
}

fn check_workspace<T: Scalar>(ws: &Workspace<T>, req: &WorkspaceReq) -> Result<()> {
    if ws.satisfies(req) {
        Ok(())
    } else {
        Err(Error::invalid_size(
            "ws",
            "workspace smaller than the sizing query for this call",
        ))
    }
}

/// Transpose-mode validity for the reflector appliers: complex precisions
/// take the conjugate transpose, real precisions the plain transpose
fn check_trans<T: Scalar>(trans: Operation) -> Result<()> {
    if T::IS_COMPLEX && trans == Operation::Transpose {
        return Err(Error::invalid_value(
            "trans",
            "complex precisions use ConjTranspose",
        ));
    }
    if !T::IS_COMPLEX && trans == Operation::ConjTranspose {
        return Err(Error::invalid_value(
            "trans",
            "real precisions use Transpose",
        ));
    }
    Ok(())
}

/// Carves per-operand runs out of the pointer-array workspace region
///
/// Batched-layout operands consume `batch_count` slots each; packed layouts
/// consume none. The workspace check has already guaranteed the region is
/// long enough for every operand of the call.
struct PtrSlots<'a> {
    rest: &'a mut [u64],
}

impl<'a> PtrSlots<'a> {
    fn new(region: &'a mut [u64]) -> Self {
        Self { rest: region }
    }

    fn take(&mut self, layout: Layout, batch_count: usize) -> &'a mut [u64] {
        let count = match layout {
            Layout::Batched => batch_count,
            Layout::Strided | Layout::Interleaved => 0,
        };
        let rest = std::mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(count);
        self.rest = tail;
        head
    }
}

impl Lapack for CpuClient {
    fn larfg<T: Scalar>(
        &self,
        alpha: &mut MatrixBatchMut<'_, T>,
        x: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        larf::larfg(alpha, x, tau, ws)
    }

    fn larf<T: Scalar>(
        &self,
        side: Side,
        v: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        larf::larf(side, v, tau, c, ws)
    }

    fn larft<T: Scalar>(
        &self,
        direct: Direction,
        storev: StorageMode,
        n: usize,
        k: usize,
        v: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        t: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        larft::larft(direct, storev, n, k, v, tau, t, ws)
    }

    fn larfb<T: Scalar>(
        &self,
        side: Side,
        trans: Operation,
        direct: Direction,
        storev: StorageMode,
        k: usize,
        v: &mut MatrixBatchMut<'_, T>,
        t: &mut MatrixBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        larfb::larfb(side, trans, direct, storev, k, v, t, c, ws)
    }

    fn getf2<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        ipiv: Option<&mut VecBatchMut<'_, i32>>,
        info: &mut [i32],
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        getf2::getf2(a, ipiv, info, ws)
    }

    fn getrf<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        ipiv: Option<&mut VecBatchMut<'_, i32>>,
        info: &mut [i32],
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        getrf::getrf(a, ipiv, info, cfg, ws)
    }

    fn getrs<T: Scalar>(
        &self,
        trans: Operation,
        a: &mut MatrixBatchMut<'_, T>,
        ipiv: Option<&mut VecBatchMut<'_, i32>>,
        b: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        getrs::getrs(trans, a, ipiv, b, ws)
    }

    fn geqr2<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        geqr::geqr2(a, tau, ws)
    }

    fn geqrf<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        geqr::geqrf(a, tau, cfg, ws)
    }

    fn gelq2<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        gelq::gelq2(a, tau, ws)
    }

    fn gelqf<T: Scalar>(
        &self,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        gelq::gelqf(a, tau, cfg, ws)
    }

    fn ormqr<T: Scalar>(
        &self,
        side: Side,
        trans: Operation,
        k: usize,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        ormqr::ormqr(side, trans, k, a, tau, c, cfg, ws)
    }

    fn ormlq<T: Scalar>(
        &self,
        side: Side,
        trans: Operation,
        k: usize,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        ormlq::ormlq(side, trans, k, a, tau, c, cfg, ws)
    }

    fn ormbr<T: Scalar>(
        &self,
        storev: StorageMode,
        side: Side,
        trans: Operation,
        k: usize,
        a: &mut MatrixBatchMut<'_, T>,
        tau: &mut VecBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        cfg: BlockConfig,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        ormbr::ormbr(storev, side, trans, k, a, tau, c, cfg, ws)
    }

    fn geblttrf_npvt<T: Scalar>(
        &self,
        nb: usize,
        nblocks: usize,
        a: &mut MatrixBatchMut<'_, T>,
        b: &mut MatrixBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        info: &mut [i32],
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        geblt::geblttrf_npvt(nb, nblocks, a, b, c, info, ws)
    }

    fn geblttrs_npvt<T: Scalar>(
        &self,
        nb: usize,
        nblocks: usize,
        nrhs: usize,
        a: &mut MatrixBatchMut<'_, T>,
        b: &mut MatrixBatchMut<'_, T>,
        c: &mut MatrixBatchMut<'_, T>,
        x: &mut MatrixBatchMut<'_, T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        geblt::geblttrs_npvt(nb, nblocks, nrhs, a, b, c, x, ws)
    }
}
