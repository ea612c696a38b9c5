use crate::context::Context;
use crate::error::HandleError;
use crate::fn_trait::FnTrait;
use crate::injector::{Inject, Injector};
use crate::responder::Responder;
use async_trait::async_trait;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// A stored route or error handler, invoked through an injector.
///
/// All of the handler's inputs come from the injector chain; its return
/// value has already been applied to the response when `invoke` completes.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, injector: &Injector) -> Result<(), HandleError>;
}

/// A [`FnTrait`] holder which adapts any injectable async fn into a [`Handler`].
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

/// Wraps an async function whose parameters are injectable and whose return
/// value is a [`Responder`].
pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler { f, _phantom: PhantomData }
}

#[async_trait]
impl<F, Args> Handler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    Args: Inject,
    F::Output: Responder,
{
    async fn invoke(&self, injector: &Injector) -> Result<(), HandleError> {
        let output = injector.apply::<F, Args>(&self.f).await?;
        let ctx = injector.resolve::<Context>()?;
        output.respond(&ctx)
    }
}

/// A stored path-variable converter.
///
/// Unlike a [`Handler`], a converter produces a value: the type-erased
/// result lands in the context's converted-variable map.
#[async_trait]
pub(crate) trait Converter: Send + Sync {
    async fn convert(&self, injector: &Injector) -> Result<Arc<dyn Any + Send + Sync>, HandleError>;
}

pub(crate) struct FnConverter<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnConverter<F, Args>
where
    F: FnTrait<Args>,
{
    pub(crate) fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

#[async_trait]
impl<F, Args> Converter for FnConverter<F, Args>
where
    F: FnTrait<Args>,
    Args: Inject,
    F::Output: Send + Sync + 'static,
{
    async fn convert(&self, injector: &Injector) -> Result<Arc<dyn Any + Send + Sync>, HandleError> {
        let value = injector.apply::<F, Args>(&self.f).await?;
        Ok(Arc::new(value))
    }
}
