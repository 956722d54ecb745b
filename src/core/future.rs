//! # Future Resolver
//!
//! 아직 등록되지 않은 서비스를 요청한 호출자의 대기 핸들(`ServiceFuture`)과
//! 키별 대기자 목록을 관리합니다.
//!
//! 대기자 등록은 레지스트리 잠금 안에서 Active 여부 확인과 함께 수행되므로
//! "확인 후 등록" 사이에 서비스가 활성화되어 깨우기를 놓치는 경쟁이 없습니다.
//! 등록/활성화 경로는 같은 잠금 안에서 대기자 목록을 비우고, 잠금을 놓은 뒤
//! 반환 직전에 각 대기자를 해결합니다.
//!
//! `ServiceFuture`는 블로킹(`wait`, `wait_timeout`)과 비동기(`.await`) 양쪽으로 사용할 수 있습니다.
//!
//! ```rust,ignore
//! let symbols = container.get_future::<SymbolIndex>();
//!
//! // 백그라운드 스레드에서 블로킹 대기
//! std::thread::spawn(move || {
//!     let index = symbols.wait()?;
//!     index.rebuild();
//!     Ok::<_, ContainerError>(())
//! });
//!
//! // 또는 async 컨텍스트에서
//! let index = container.get_future::<SymbolIndex>().await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_util::task::AtomicWaker;

use crate::core::errors::{ContainerError, ContainerResult};
use crate::core::key::ServiceKey;
use crate::core::registry::ContainerInner;
use crate::core::service::ServiceInstance;

enum PromiseState {
    Pending,
    Resolved(ServiceInstance),
    Cancelled,
}

/// 단일 생산자(등록/활성화 경로), 단일 소비자(`ServiceFuture`) 해결 슬롯
pub(crate) struct Promise {
    state: Mutex<PromiseState>,
    ready: Condvar,
    waker: AtomicWaker,
}

impl Promise {
    fn pending() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PromiseState::Pending),
            ready: Condvar::new(),
            waker: AtomicWaker::new(),
        })
    }

    fn resolved(instance: ServiceInstance) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PromiseState::Resolved(instance)),
            ready: Condvar::new(),
            waker: AtomicWaker::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PromiseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn resolve(&self, instance: ServiceInstance) {
        self.settle(PromiseState::Resolved(instance));
    }

    fn cancel(&self) {
        self.settle(PromiseState::Cancelled);
    }

    /// 최초의 해결만 유효합니다.
    fn settle(&self, outcome: PromiseState) {
        {
            let mut state = self.lock();
            if !matches!(*state, PromiseState::Pending) {
                return;
            }
            *state = outcome;
        }
        self.ready.notify_all();
        self.waker.wake();
    }
}

pub(crate) struct Waiter {
    id: u64,
    promise: Arc<Promise>,
}

/// 키별 미해결 대기자 목록
///
/// 레지스트리 상태의 일부이며 항상 레지스트리 잠금 안에서만 접근됩니다.
#[derive(Default)]
pub(crate) struct WaiterRegistry {
    waiters: HashMap<ServiceKey, Vec<Waiter>>,
    next_id: u64,
}

impl WaiterRegistry {
    fn enqueue(&mut self, key: ServiceKey) -> (u64, Arc<Promise>) {
        self.next_id += 1;
        let id = self.next_id;
        let promise = Promise::pending();

        self.waiters.entry(key).or_default().push(Waiter {
            id,
            promise: promise.clone(),
        });

        (id, promise)
    }

    /// 키의 대기자를 모두 꺼냅니다. 해결은 호출자가 잠금 밖에서 수행합니다.
    pub(crate) fn drain(&mut self, key: ServiceKey) -> Vec<Arc<Promise>> {
        self.waiters
            .remove(&key)
            .map(|waiters| waiters.into_iter().map(|w| w.promise).collect())
            .unwrap_or_default()
    }

    /// 하나의 대기자만 제거합니다. 같은 키의 다른 대기자와 키 상태는 건드리지 않습니다.
    pub(crate) fn withdraw(&mut self, key: ServiceKey, id: u64) -> Option<Arc<Promise>> {
        let waiters = self.waiters.get_mut(&key)?;
        let index = waiters.iter().position(|w| w.id == id)?;
        let waiter = waiters.swap_remove(index);

        if waiters.is_empty() {
            self.waiters.remove(&key);
        }

        Some(waiter.promise)
    }

    pub(crate) fn count(&self, key: ServiceKey) -> usize {
        self.waiters.get(&key).map_or(0, Vec::len)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = ServiceKey> + '_ {
        self.waiters.keys().copied()
    }

    pub(crate) fn enqueue_future<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        key: ServiceKey,
        container: Weak<ContainerInner>,
    ) -> ServiceFuture<T> {
        let (id, promise) = self.enqueue(key);

        ServiceFuture {
            key,
            promise,
            registration: Some(WaiterRegistration { container, id }),
            _marker: PhantomData,
        }
    }
}

struct WaiterRegistration {
    container: Weak<ContainerInner>,
    id: u64,
}

/// 서비스가 활성화되면 해결되는 대기 핸들
///
/// 같은 키에 대한 여러 `ServiceFuture`는 서로 독립된 핸들이지만 모두 같은
/// 활성 인스턴스로 해결됩니다. 한 번 해결된 핸들은 이후 키가 제거되거나
/// 다시 등록되어도 처음 받은 인스턴스를 유지합니다.
///
/// 해결되기 전에 drop되면 컨테이너의 대기자 목록에서 스스로 빠집니다.
#[must_use = "a ServiceFuture does nothing unless waited on or polled"]
pub struct ServiceFuture<T: ?Sized> {
    key: ServiceKey,
    promise: Arc<Promise>,
    registration: Option<WaiterRegistration>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ServiceFuture<T> {
    pub(crate) fn ready(key: ServiceKey, instance: ServiceInstance) -> Self {
        Self {
            key,
            promise: Promise::resolved(instance),
            registration: None,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.promise.lock(), PromiseState::Resolved(_))
    }

    /// 블로킹 없이 현재 상태를 확인합니다. 아직 해결되지 않았다면 `Ok(None)`입니다.
    pub fn try_get(&self) -> ContainerResult<Option<Arc<T>>> {
        let state = self.promise.lock();
        self.read(&state)
    }

    /// 서비스가 활성화될 때까지 현재 스레드를 블로킹합니다.
    ///
    /// # Errors
    ///
    /// * `Cancelled` - 대기가 취소된 경우
    pub fn wait(&self) -> ContainerResult<Arc<T>> {
        let mut state = self.promise.lock();
        loop {
            if let Some(instance) = self.read(&state)? {
                return Ok(instance);
            }
            state = self
                .promise
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// 최대 `timeout` 동안 블로킹합니다.
    ///
    /// 시간 초과 시 대기자는 목록에 남아 있으므로 다시 기다릴 수 있습니다.
    ///
    /// # Errors
    ///
    /// * `Timeout` - 제한 시간 안에 해결되지 않은 경우
    /// * `Cancelled` - 대기가 취소된 경우
    pub fn wait_timeout(&self, timeout: Duration) -> ContainerResult<Arc<T>> {
        // 표현할 수 없는 마감 시각은 무기한 대기로 취급
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        let mut state = self.promise.lock();
        loop {
            if let Some(instance) = self.read(&state)? {
                return Ok(instance);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ContainerError::Timeout(self.key.name()));
            }
            state = self
                .promise
                .ready
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// 이 핸들만 대기자 목록에서 빼고 `Cancelled`로 해결합니다.
    ///
    /// 이미 해결된 핸들에는 영향이 없습니다.
    pub fn cancel(&self) {
        self.withdraw();
        self.promise.cancel();
    }

    fn withdraw(&self) {
        let Some(registration) = &self.registration else {
            return;
        };
        if let Some(container) = registration.container.upgrade() {
            container.withdraw_waiter(self.key, registration.id);
        }
    }

    fn read(&self, state: &PromiseState) -> ContainerResult<Option<Arc<T>>> {
        match state {
            PromiseState::Pending => Ok(None),
            PromiseState::Resolved(instance) => instance.downcast::<T>(self.key).map(Some),
            PromiseState::Cancelled => Err(ContainerError::Cancelled(self.key.name())),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Future for ServiceFuture<T> {
    type Output = ContainerResult<Arc<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.try_get().transpose() {
            return Poll::Ready(result);
        }

        self.promise.waker.register(cx.waker());

        // 등록과 해결 사이의 경쟁을 막기 위해 다시 확인
        match self.try_get().transpose() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

impl<T: ?Sized> Drop for ServiceFuture<T> {
    fn drop(&mut self) {
        let pending = matches!(*self.promise.lock(), PromiseState::Pending);
        if !pending {
            return;
        }
        if let Some(registration) = &self.registration {
            if let Some(container) = registration.container.upgrade() {
                container.withdraw_waiter(self.key, registration.id);
            }
        }
    }
}

impl<T: ?Sized> fmt::Debug for ServiceFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.promise.lock() {
            PromiseState::Pending => "pending",
            PromiseState::Resolved(_) => "resolved",
            PromiseState::Cancelled => "cancelled",
        };
        f.debug_struct("ServiceFuture")
            .field("key", &self.key)
            .field("state", &state)
            .finish()
    }
}
