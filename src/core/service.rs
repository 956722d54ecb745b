//! # Service Instances
//!
//! 컨테이너가 보관하는 타입 소거된 서비스 인스턴스와 해제(Disposable) 기능을 정의합니다.
//!
//! 해제 기능은 런타임 타입 검사가 아니라 등록 시점의 트레이트 경계로 결정됩니다.
//! `register_disposable` / `register_disposable_factory`로 등록된 서비스만
//! 종료 시퀀스에 참여하며, 그 여부는 인스턴스가 만들어질 때 한 번만 기록됩니다.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::errors::{BoxError, ContainerError, ContainerResult};
use crate::core::key::ServiceKey;

/// 종료 시 명시적으로 정리되어야 하는 서비스
///
/// 컨테이너는 `shutdown()`에서 활성화의 역순으로 `dispose()`를 호출합니다.
///
/// # Examples
///
/// ```rust,ignore
/// struct ProfilerSession { /* ... */ }
///
/// impl Disposable for ProfilerSession {
///     fn dispose(&self) -> Result<(), BoxError> {
///         self.flush_samples()?;
///         Ok(())
///     }
/// }
///
/// container.register_disposable(Arc::new(ProfilerSession::start()))?;
/// ```
pub trait Disposable: Send + Sync {
    fn dispose(&self) -> Result<(), BoxError>;
}

impl<T: Disposable + ?Sized> Disposable for Arc<T> {
    fn dispose(&self) -> Result<(), BoxError> {
        (**self).dispose()
    }
}

/// 타입 소거된 활성 서비스 인스턴스
///
/// 내부적으로 `Arc<T>` 자체를 `Any`로 감싸 보관하므로 `T`가 `dyn Trait`이어도
/// 원래의 `Arc<T>`로 되돌릴 수 있습니다. 복제는 참조 카운트 증가만 일으킵니다.
#[derive(Clone)]
pub struct ServiceInstance {
    value: Arc<dyn Any + Send + Sync>,
    disposer: Option<Arc<dyn Disposable>>,
}

impl ServiceInstance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            value: Arc::new(instance),
            disposer: None,
        }
    }

    pub fn disposable<T: ?Sized + Disposable + 'static>(instance: Arc<T>) -> Self {
        Self {
            value: Arc::new(instance.clone()),
            disposer: Some(Arc::new(instance)),
        }
    }

    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    pub(crate) fn disposer(&self) -> Option<Arc<dyn Disposable>> {
        self.disposer.clone()
    }

    /// 등록 시의 `Arc<T>`로 되돌립니다.
    ///
    /// # Errors
    ///
    /// * `TypeMismatch` - 인스턴스가 `T`로 등록되지 않은 경우
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self, key: ServiceKey) -> ContainerResult<Arc<T>> {
        self.value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ContainerError::TypeMismatch(key.name()))
    }

    /// 두 핸들이 같은 인스턴스를 가리키는지 확인합니다.
    pub fn same_instance(&self, other: &ServiceInstance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("disposable", &self.is_disposable())
            .finish_non_exhaustive()
    }
}
