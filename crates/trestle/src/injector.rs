//! Type-keyed dependency injection.
//!
//! An [`Injector`] maps type identities to shared service instances and
//! optionally delegates to a parent injector. Handlers, middleware and
//! converters declare arbitrary parameter lists; every parameter type that
//! implements [`Inject`] is resolved against the injector chain before the
//! function is invoked, so the type system itself is the binding contract.
//!
//! The application owns one root injector for its whole lifetime. Each
//! request gets its own injector parented to the root, and converter or
//! handler invocations spawn further short-lived injectors parented to the
//! request one.

use crate::fn_trait::FnTrait;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Resolution failure: nothing registered for the requested type anywhere in
/// the injector chain.
#[derive(Error, Debug)]
#[error("no service registered for type `{type_name}`")]
pub struct InjectError {
    type_name: &'static str,
}

impl InjectError {
    fn not_found<T: ?Sized>() -> Self {
        InjectError { type_name: type_name::<T>() }
    }

    /// The name of the type that could not be resolved.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

type BoxedService = Box<dyn Any + Send + Sync>;

/// A dependency injection container keyed by type identity.
pub struct Injector {
    services: RwLock<HashMap<TypeId, BoxedService>>,
    parent: Option<Arc<Injector>>,
}

impl Injector {
    /// Creates a root injector with no parent.
    pub fn new() -> Self {
        Self { services: RwLock::new(HashMap::new()), parent: None }
    }

    /// Creates an injector delegating unresolved lookups to `parent`.
    pub fn with_parent(parent: Arc<Injector>) -> Self {
        Self { services: RwLock::new(HashMap::new()), parent: Some(parent) }
    }

    pub fn parent(&self) -> Option<&Arc<Injector>> {
        self.parent.as_ref()
    }

    /// Registers a service under its concrete type.
    ///
    /// A later registration for the same type overwrites the earlier one
    /// within this injector; registrations in parents are only shadowed.
    pub fn register<T: Send + Sync + 'static>(&self, service: T) {
        self.register_arc(Arc::new(service));
    }

    /// Registers a shared service under the type `T`.
    ///
    /// With `T` being a trait object this is the capability binding: a
    /// concrete implementation becomes resolvable through the interface it
    /// implements.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use trestle::Injector;
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    /// struct FixedClock;
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> u64 {
    ///         42
    ///     }
    /// }
    ///
    /// let injector = Injector::new();
    /// injector.register_arc::<dyn Clock>(Arc::new(FixedClock));
    /// assert_eq!(injector.resolve::<dyn Clock>().unwrap().now(), 42);
    /// ```
    pub fn register_arc<T: ?Sized + Send + Sync + 'static>(&self, service: Arc<T>) {
        self.write().insert(TypeId::of::<T>(), Box::new(service));
    }

    /// Resolves the service registered for `T`, local registrations first,
    /// then the parent chain.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        if let Some(service) = self.read().get(&TypeId::of::<T>()).and_then(|boxed| boxed.downcast_ref::<Arc<T>>()) {
            return Ok(Arc::clone(service));
        }
        match &self.parent {
            Some(parent) => parent.resolve::<T>(),
            None => Err(InjectError::not_found::<T>()),
        }
    }

    /// Resolves every parameter of `f` in declaration order, then invokes it.
    ///
    /// Fails with the first parameter that cannot be resolved; the error
    /// names the missing type.
    pub async fn apply<F, Args>(&self, f: &F) -> Result<F::Output, InjectError>
    where
        F: FnTrait<Args>,
        Args: Inject,
    {
        let args = Args::inject(self)?;
        Ok(f.call(args).await)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, BoxedService>> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, BoxedService>> {
        self.services.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

/// A handler parameter resolvable from an [`Injector`].
pub trait Inject: Sized + Send + 'static {
    fn inject(injector: &Injector) -> Result<Self, InjectError>;
}

impl<T: ?Sized + Send + Sync + 'static> Inject for Arc<T> {
    fn inject(injector: &Injector) -> Result<Self, InjectError> {
        injector.resolve::<T>()
    }
}

/// impl `Inject` for parameter tuples, resolving each element in order.
macro_rules! impl_inject_for_tuple ({ $($param:ident)* } => {
    impl<$($param: Inject,)*> Inject for ($($param,)*) {
        #[allow(unused_variables)]
        fn inject(injector: &Injector) -> Result<Self, InjectError> {
            Ok(($($param::inject(injector)?,)*))
        }
    }
});

impl_inject_for_tuple! {}
impl_inject_for_tuple! { A }
impl_inject_for_tuple! { A B }
impl_inject_for_tuple! { A B C }
impl_inject_for_tuple! { A B C D }
impl_inject_for_tuple! { A B C D E }
impl_inject_for_tuple! { A B C D E F }
impl_inject_for_tuple! { A B C D E F G }
impl_inject_for_tuple! { A B C D E F G H }
impl_inject_for_tuple! { A B C D E F G H I }
impl_inject_for_tuple! { A B C D E F G H I J }
impl_inject_for_tuple! { A B C D E F G H I J K }
impl_inject_for_tuple! { A B C D E F G H I J K L }
