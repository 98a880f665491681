// ============================================================
// Layer 5 — Gradient Utilities
// ============================================================
// Operations on a model's GradientsParams between backward()
// and the optimizer step.
//
//   clip_grad_norm  one L2 norm over every gradient of the
//                   model; all of them are scaled by
//                   min(1, max_norm / (norm + 1e-6))
//   split_off       moves the gradients of a sub-module into a
//                   new GradientsParams (differential lr)
//
// Parameters are reached through ModuleVisitor, so only ids
// that belong to the visited module are touched. Parameters
// without a gradient (a frozen backbone) are skipped.
//
// Reference: Pascanu et al. (2013) gradient norm clipping

use std::marker::PhantomData;

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

const CLIP_EPS: f64 = 1e-6;

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads:   &'a GradientsParams,
    sum:     f64,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum += (grad.clone() * grad).sum().into_scalar().elem::<f64>();
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads:   &'a mut GradientsParams,
    factor:  f64,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.factor));
        }
    }
}

struct MoveGrads<'a, B: AutodiffBackend> {
    from:    &'a mut GradientsParams,
    to:      GradientsParams,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for MoveGrads<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.from.remove::<B::InnerBackend, D>(id) {
            self.to.register::<B::InnerBackend, D>(id, grad);
        }
    }
}

/// L2 norm over all gradients of `module` held in `grads`.
pub fn grad_norm<B: AutodiffBackend, M: Module<B>>(module: &M, grads: &GradientsParams) -> f64 {
    let mut visitor = SquaredNorm::<B> { grads, sum: 0.0, backend: PhantomData };
    module.visit(&mut visitor);
    visitor.sum.sqrt()
}

/// Scale every gradient of `module` so their joint L2 norm is at
/// most `max_norm`. Returns the norm before clipping.
pub fn clip_grad_norm<B: AutodiffBackend, M: Module<B>>(
    module:   &M,
    grads:    &mut GradientsParams,
    max_norm: f64,
) -> f64 {
    let norm = grad_norm::<B, M>(module, grads);
    let factor = max_norm / (norm + CLIP_EPS);
    if factor < 1.0 {
        let mut visitor = Rescale::<B> { grads, factor, backend: PhantomData };
        module.visit(&mut visitor);
    }
    norm
}

/// Take the gradients of `module`'s parameters out of `grads`.
pub fn split_off<B: AutodiffBackend, M: Module<B>>(
    module: &M,
    grads:  &mut GradientsParams,
) -> GradientsParams {
    let mut visitor = MoveGrads::<B> { from: grads, to: GradientsParams::new(), backend: PhantomData };
    module.visit(&mut visitor);
    visitor.to
}
