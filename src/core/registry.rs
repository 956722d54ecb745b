//! # Service Registry - 프로세스 단위 서비스 컨테이너
//!
//! 호스트의 모든 확장(에디터, 디자이너, 프로파일러, 패키지 관리 도구)이 서로를 직접
//! 참조하지 않고 공유 서비스로 통신할 수 있게 해주는 컨테이너입니다.
//! UI 스레드와 백그라운드 초기화 스레드가 동시에 접근해도 안전합니다.
//!
//! ## 주요 구성 요소
//!
//! | 구성 요소 | 위치 | 역할 |
//! |-----------|------|------|
//! | Registry | [`ServiceContainer`] | 키 → 엔트리(Factory / Active) 매핑, 단일 잠금 규율 |
//! | Activator | [`crate::core::activator`] | 팩토리를 키당 정확히 한 번 실행 |
//! | Waiter Registry | [`crate::core::future`] | 아직 없는 서비스에 대한 `ServiceFuture` 해결 |
//! | Teardown Sequencer | [`ServiceContainer::shutdown`] | 해제 가능한 서비스를 활성화 역순으로 해제 |
//! | Provider Chain | [`ServiceProvider`] | 로컬에 키가 없을 때 부모 컨테이너로 조회 위임 |
//!
//! ## 엔트리 상태 전이
//!
//! ```text
//!            register_factory                get (최초 1회)
//!  Vacant ─────────────────────▶ Factory ─────────────────────▶ Active(instance, seq)
//!    ▲  │                           │  팩토리 실패 / 패닉              │
//!    │  │         register          └──────────▶ Vacant              │
//!    │  └────────────────────────────────────────────────────────────┘
//!    └──────────────── remove / shutdown (해제 가능한 서비스) ◀───────────┘
//! ```
//!
//! ## 잠금 규율
//!
//! - **레지스트리 잠금** (`RwLock`): 맵 구조, 종료 시퀀스, 대기자 목록, 시퀀스 번호를 보호합니다.
//!   짧게만 잡으며, 팩토리나 `dispose()` 같은 외부 콜백 실행 중에는 절대 잡지 않습니다.
//! - **키 단위 활성화 잠금**: 팩토리 엔트리마다 있는 `OnceCell`. 같은 키의 동시 요청자만
//!   서로를 기다리고, 관계없는 서비스는 동시에 활성화됩니다.
//!
//! 시퀀스 번호는 Active 전이와 같은 임계 구역에서 부여되므로, 종료 순서는 경합 상황에서도
//! 실제 활성화 순서를 정확히 반영합니다.
//!
//! ## 사용 패턴
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use service_container::core::registry::ServiceContainer;
//!
//! // 조합 루트(composition root)에서 한 번 생성
//! let host = ServiceContainer::with_config(ContainerConfig::from_env());
//!
//! // 즉시 등록
//! host.register(Arc::new(MessageLog::new()))?;
//!
//! // 지연 등록: 첫 get 시점에 팩토리 실행, 팩토리는 다른 서비스를 조회할 수 있음
//! host.register_disposable_factory(|c| {
//!     let log = c.require::<MessageLog>()?;
//!     Ok(Arc::new(SymbolCache::open(log)?))
//! })?;
//!
//! // 창(window)마다 자식 컨테이너: 로컬에 없는 키는 부모에서 조회
//! let window = host.child("window-1");
//! let cache = window.require::<SymbolCache>()?;
//!
//! // 종료: 활성화 역순으로 해제
//! window.shutdown()?;
//! host.shutdown()?;
//! ```
//!
//! ## 주의사항
//!
//! 팩토리가 자기 자신의 키를 다시 조회하면 교착 상태가 됩니다. 순환 감지는 하지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{ContainerConfig, ShutdownPolicy};
use crate::core::activator::{ActivationSlot, ServiceFactory};
use crate::core::errors::{BoxError, ContainerError, ContainerResult};
use crate::core::future::{Promise, ServiceFuture, WaiterRegistry};
use crate::core::key::ServiceKey;
use crate::core::provider::ServiceProvider;
use crate::core::service::{Disposable, ServiceInstance};

enum ServiceEntry {
    Factory(Arc<ActivationSlot>),
    Active(ActiveService),
}

struct ActiveService {
    instance: ServiceInstance,
    sequence: u64,
    activated_at: DateTime<Utc>,
}

/// 레지스트리 잠금이 보호하는 모든 공유 상태
#[derive(Default)]
struct RegistryState {
    services: HashMap<ServiceKey, ServiceEntry>,
    /// 해제 가능한 Active 키, 활성화 순서대로
    teardown: Vec<ServiceKey>,
    waiters: WaiterRegistry,
    next_sequence: u64,
}

impl RegistryState {
    /// Active 전이를 기록하고 해결할 대기자를 돌려줍니다.
    fn activate(&mut self, key: ServiceKey, instance: ServiceInstance) -> Vec<Arc<Promise>> {
        self.next_sequence += 1;

        if instance.is_disposable() {
            self.teardown.push(key);
        }

        self.services.insert(
            key,
            ServiceEntry::Active(ActiveService {
                instance,
                sequence: self.next_sequence,
                activated_at: Utc::now(),
            }),
        );

        self.waiters.drain(key)
    }
}

pub(crate) struct ContainerInner {
    config: ContainerConfig,
    parent: Option<Arc<dyn ServiceProvider>>,
    state: RwLock<RegistryState>,
}

impl ContainerInner {
    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn withdraw_waiter(&self, key: ServiceKey, id: u64) -> bool {
        self.write_state().waiters.withdraw(key, id).is_some()
    }
}

/// 서비스 컨테이너 핸들
///
/// 복제 비용이 낮은 공유 핸들이며, 모든 복제본은 같은 레지스트리를 가리킵니다.
/// 숨겨진 전역 싱글톤이 아니므로 테스트마다 독립된 컨테이너를 만들 수 있습니다.
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

/// `snapshot()`에서 보고하는 엔트리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// 등록되었지만 아직 활성화되지 않은 팩토리
    Factory,
    Active,
    /// 키는 비어 있고 대기 중인 `ServiceFuture`만 있음
    Awaited,
}

/// 진단용 엔트리 요약
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub key: &'static str,
    pub type_name: &'static str,
    pub state: ServiceState,
    pub sequence: Option<u64>,
    pub disposable: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub waiters: usize,
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    /// 기본 설정의 루트 컨테이너를 생성합니다.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self::build(config, None)
    }

    /// 부모 공급자를 가진 컨테이너를 생성합니다.
    ///
    /// 로컬 엔트리가 없는 키(Vacant)의 `get`만 부모에게 위임됩니다.
    pub fn with_parent(config: ContainerConfig, parent: Arc<dyn ServiceProvider>) -> Self {
        Self::build(config, Some(parent))
    }

    /// 이 컨테이너를 부모로 하는 자식 컨테이너를 생성합니다.
    ///
    /// 자식은 부모의 종료 정책을 물려받습니다.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let window = host.child("window-1");
    /// window.register(Arc::new(DocumentTracker::default()))?;
    ///
    /// // 로컬에 없으므로 host에서 조회
    /// let log = window.require::<MessageLog>()?;
    /// ```
    pub fn child(&self, name: impl Into<String>) -> Self {
        let config = ContainerConfig::named(name).shutdown_policy(self.inner.config.shutdown_policy);
        Self::with_parent(config, Arc::new(self.clone()))
    }

    fn build(config: ContainerConfig, parent: Option<Arc<dyn ServiceProvider>>) -> Self {
        info!(
            "[{}] Service container created (shutdown policy: {}, parent: {})",
            config.name,
            config.shutdown_policy.as_str(),
            if parent.is_some() { "yes" } else { "no" }
        );

        Self {
            inner: Arc::new(ContainerInner {
                config,
                parent,
                state: RwLock::new(RegistryState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn has_parent(&self) -> bool {
        self.inner.parent.is_some()
    }

    // --- 등록 ---

    /// 준비된 인스턴스를 즉시 Active로 등록합니다.
    ///
    /// 다음 시퀀스 번호를 부여하고, 이 키를 기다리던 모든 `ServiceFuture`를 해결합니다.
    ///
    /// # Errors
    ///
    /// * `DuplicateKey` - 키가 이미 Factory 또는 Active 상태인 경우 (기존 엔트리는 유지됨)
    pub fn register<T: ?Sized + Send + Sync + 'static>(&self, instance: Arc<T>) -> ContainerResult<()> {
        self.register_instance(ServiceKey::of::<T>(), ServiceInstance::new(instance))
    }

    /// `register`와 같지만, 인스턴스가 종료 시퀀스에 참여합니다.
    pub fn register_disposable<T: ?Sized + Disposable + 'static>(&self, instance: Arc<T>) -> ContainerResult<()> {
        self.register_instance(ServiceKey::of::<T>(), ServiceInstance::disposable(instance))
    }

    /// 타입 소거된 인스턴스를 임의의 키로 등록합니다.
    pub fn register_instance(&self, key: ServiceKey, instance: ServiceInstance) -> ContainerResult<()> {
        let waiters = {
            let mut state = self.inner.write_state();
            if state.services.contains_key(&key) {
                return Err(ContainerError::DuplicateKey(key.name()));
            }
            state.activate(key, instance.clone())
        };

        debug!(
            "[{}] Registered service: {}{}",
            self.name(),
            key,
            if instance.is_disposable() { " (disposable)" } else { "" }
        );
        resolve_waiters(waiters, &instance);

        Ok(())
    }

    /// 지연 생성 팩토리를 등록합니다.
    ///
    /// 팩토리는 첫 `get` 시점에 한 번만 실행되며, 실행 중인 컨테이너를 인자로 받아
    /// 다른 서비스를 조회할 수 있습니다. 등록 자체는 시퀀스 번호나 대기자를 건드리지 않습니다.
    ///
    /// # Errors
    ///
    /// * `DuplicateKey` - 키가 이미 Factory 또는 Active 상태인 경우
    pub fn register_factory<T, F>(&self, factory: F) -> ContainerResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&ServiceContainer) -> Result<Arc<T>, BoxError> + Send + 'static,
    {
        self.insert_factory(
            ServiceKey::of::<T>(),
            Box::new(move |container: &ServiceContainer| factory(container).map(ServiceInstance::new::<T>)),
        )
    }

    /// 활성화된 인스턴스가 종료 시퀀스에 참여하는 팩토리를 등록합니다.
    pub fn register_disposable_factory<T, F>(&self, factory: F) -> ContainerResult<()>
    where
        T: ?Sized + Disposable + 'static,
        F: FnOnce(&ServiceContainer) -> Result<Arc<T>, BoxError> + Send + 'static,
    {
        self.insert_factory(
            ServiceKey::of::<T>(),
            Box::new(move |container: &ServiceContainer| factory(container).map(ServiceInstance::disposable::<T>)),
        )
    }

    fn insert_factory(&self, key: ServiceKey, factory: ServiceFactory) -> ContainerResult<()> {
        let mut state = self.inner.write_state();
        if state.services.contains_key(&key) {
            return Err(ContainerError::DuplicateKey(key.name()));
        }
        state
            .services
            .insert(key, ServiceEntry::Factory(ActivationSlot::new(factory)));

        debug!("[{}] Registered factory: {}", self.name(), key);
        Ok(())
    }

    // --- 조회 ---

    /// 서비스를 조회합니다.
    ///
    /// - Active: 인스턴스 반환
    /// - Factory: 팩토리를 실행(또는 진행 중인 활성화를 대기)한 뒤 인스턴스 반환
    /// - Vacant: 부모가 있으면 부모에게 위임, 없으면 `Ok(None)`
    ///
    /// # Errors
    ///
    /// * `ActivationFailure` - 팩토리가 실패하거나 패닉한 경우. 엔트리는 Vacant로 돌아가므로
    ///   새 팩토리를 등록해 다시 시도할 수 있습니다.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> ContainerResult<Option<Arc<T>>> {
        let key = ServiceKey::of::<T>();
        match self.get_service(key)? {
            Some(instance) => instance.downcast::<T>(key).map(Some),
            None => Ok(None),
        }
    }

    /// `get`과 같지만 서비스가 없으면 `NotFound`를 반환합니다.
    pub fn require<T: ?Sized + Send + Sync + 'static>(&self) -> ContainerResult<Arc<T>> {
        self.get::<T>()?
            .ok_or(ContainerError::NotFound(ServiceKey::of::<T>().name()))
    }

    /// 로컬 레지스트리에 키가 있는지 확인합니다. 활성화되지 않은 팩토리도 포함합니다.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.contains_key(ServiceKey::of::<T>())
    }

    pub fn contains_key(&self, key: ServiceKey) -> bool {
        self.inner.read_state().services.contains_key(&key)
    }

    /// 서비스가 Active가 되면 해결되는 핸들을 반환합니다.
    ///
    /// 이미 Active라면 블로킹 없이 바로 해결된 핸들을 반환합니다.
    /// 팩토리만 등록된 상태라면 누군가의 `get`으로 활성화될 때 해결됩니다.
    /// 로컬 레지스트리에서만 동작하며 부모에게 위임하지 않습니다.
    ///
    /// 등록 없이 키가 제거되면 대기자는 계속 미해결로 남습니다.
    /// `ServiceFuture::cancel`이나 drop으로 대기를 철회할 수 있습니다.
    pub fn get_future<T: ?Sized + Send + Sync + 'static>(&self) -> ServiceFuture<T> {
        let key = ServiceKey::of::<T>();
        let mut state = self.inner.write_state();

        if let Some(ServiceEntry::Active(active)) = state.services.get(&key) {
            return ServiceFuture::ready(key, active.instance.clone());
        }

        state.waiters.enqueue_future(key, Arc::downgrade(&self.inner))
    }

    // --- 제거 ---

    /// 엔트리를 상태와 무관하게 제거합니다.
    ///
    /// Active였다면 종료 시퀀스에서도 빠지며, 분리된 인스턴스를 반환합니다.
    /// 이후 해제는 호출자의 책임입니다. 키가 없거나 팩토리였다면 `None`입니다.
    /// 이미 해결된 `ServiceFuture`에는 영향이 없습니다.
    pub fn remove<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let key = ServiceKey::of::<T>();
        self.remove_key(key)?.downcast::<T>(key).ok()
    }

    pub fn remove_key(&self, key: ServiceKey) -> Option<ServiceInstance> {
        let mut state = self.inner.write_state();
        let removed = state.services.remove(&key);
        if let Some(ServiceEntry::Active(active)) = &removed {
            if active.instance.is_disposable() {
                state.teardown.retain(|tracked| *tracked != key);
            }
        }
        // 팩토리 클로저가 캡처한 값의 drop이 레지스트리 잠금을 다시 잡을 수 있음
        drop(state);

        match removed? {
            ServiceEntry::Active(active) => {
                debug!("[{}] Removed service: {}", self.name(), key);
                Some(active.instance)
            }
            ServiceEntry::Factory(_) => {
                debug!("[{}] Removed factory: {}", self.name(), key);
                None
            }
        }
    }

    /// 활성화 결과를 레지스트리에 반영합니다. 활성화 슬롯의 `OnceCell` 초기화 안에서 호출됩니다.
    ///
    /// 실행 중에 키가 제거되었거나 다른 엔트리로 바뀌었다면 인스턴스는 설치되지 않고
    /// 활성화를 요청한 호출자에게만 전달됩니다.
    pub(crate) fn complete_activation(
        &self,
        key: ServiceKey,
        slot: &Arc<ActivationSlot>,
        result: ContainerResult<ServiceInstance>,
    ) -> ContainerResult<ServiceInstance> {
        let mut state = self.inner.write_state();
        let current = matches!(
            state.services.get(&key),
            Some(ServiceEntry::Factory(registered)) if Arc::ptr_eq(registered, slot)
        );

        match result {
            Ok(instance) if current => {
                let waiters = state.activate(key, instance.clone());
                drop(state);

                resolve_waiters(waiters, &instance);
                Ok(instance)
            }
            Ok(instance) => {
                drop(state);
                warn!(
                    "[{}] {} was removed while activating; instance not installed",
                    self.name(),
                    key
                );
                Ok(instance)
            }
            Err(e) => {
                let reverted = if current { state.services.remove(&key) } else { None };
                drop(state);
                drop(reverted);
                Err(e)
            }
        }
    }

    // --- 종료 ---

    /// 해제 가능한 서비스를 활성화 역순으로 해제합니다.
    ///
    /// 종료 시퀀스는 먼저 원자적으로 복사 후 비워지므로, 동시에 호출된 종료가 같은 서비스를
    /// 두 번 해제하지 않습니다. 두 번째 호출은 아무것도 해제하지 않습니다.
    /// 해제 불가능한 서비스는 레지스트리에 그대로 남습니다.
    ///
    /// # Errors
    ///
    /// * `DisposalFailure` - `FailFast` 정책에서 첫 해제 실패. 역순 순회에서 남은 서비스는 해제되지 않습니다.
    /// * `ShutdownFailures` - `BestEffort` 정책에서 모든 해제를 시도한 뒤 수집된 실패 목록
    pub fn shutdown(&self) -> ContainerResult<()> {
        let tracked = std::mem::take(&mut self.inner.write_state().teardown);
        let policy = self.inner.config.shutdown_policy;

        info!(
            "[{}] Shutting down {} disposable service(s)",
            self.name(),
            tracked.len()
        );

        let mut disposed = 0usize;
        let mut failures = Vec::new();

        for key in tracked.into_iter().rev() {
            let Some(disposer) = self.detach_disposable(key) else {
                continue;
            };

            debug!("[{}] Service shutdown: {}", self.name(), key);
            match disposer.dispose() {
                Ok(()) => disposed += 1,
                Err(e) => {
                    let error = ContainerError::disposal(key, e);
                    warn!("[{}] {}", self.name(), error);

                    match policy {
                        ShutdownPolicy::FailFast => return Err(error),
                        ShutdownPolicy::BestEffort => failures.push(error),
                    }
                }
            }
        }

        info!(
            "[{}] Shutdown complete: {} disposed, {} failed",
            self.name(),
            disposed,
            failures.len()
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::ShutdownFailures(failures))
        }
    }

    /// 아직 Active이고 해제 가능한 경우에만 레지스트리에서 떼어냅니다.
    fn detach_disposable(&self, key: ServiceKey) -> Option<Arc<dyn Disposable>> {
        let mut state = self.inner.write_state();

        let disposer = match state.services.get(&key) {
            Some(ServiceEntry::Active(active)) => active.instance.disposer()?,
            _ => return None,
        };
        let detached = state.services.remove(&key);
        drop(state);
        drop(detached);

        Some(disposer)
    }

    // --- 진단 ---

    /// 로컬 레지스트리의 엔트리 요약을 활성화 순서대로 반환합니다.
    ///
    /// Active 엔트리가 시퀀스 순으로 먼저 오고, 팩토리와 대기 중인 키가 이름 순으로 뒤따릅니다.
    pub fn snapshot(&self) -> Vec<ServiceInfo> {
        let state = self.inner.read_state();

        let mut infos: Vec<ServiceInfo> = state
            .services
            .iter()
            .map(|(key, entry)| match entry {
                ServiceEntry::Factory(_) => ServiceInfo {
                    key: key.short_name(),
                    type_name: key.name(),
                    state: ServiceState::Factory,
                    sequence: None,
                    disposable: false,
                    activated_at: None,
                    waiters: state.waiters.count(*key),
                },
                ServiceEntry::Active(active) => ServiceInfo {
                    key: key.short_name(),
                    type_name: key.name(),
                    state: ServiceState::Active,
                    sequence: Some(active.sequence),
                    disposable: active.instance.is_disposable(),
                    activated_at: Some(active.activated_at),
                    waiters: 0,
                },
            })
            .collect();

        infos.extend(
            state
                .waiters
                .keys()
                .filter(|key| !state.services.contains_key(key))
                .map(|key| ServiceInfo {
                    key: key.short_name(),
                    type_name: key.name(),
                    state: ServiceState::Awaited,
                    sequence: None,
                    disposable: false,
                    activated_at: None,
                    waiters: state.waiters.count(key),
                }),
        );

        infos.sort_by(|a, b| {
            (a.sequence.is_none(), a.sequence, a.key).cmp(&(b.sequence.is_none(), b.sequence, b.key))
        });
        infos
    }
}

impl ServiceProvider for ServiceContainer {
    fn get_service(&self, key: ServiceKey) -> ContainerResult<Option<ServiceInstance>> {
        let slot = {
            let state = self.inner.read_state();
            match state.services.get(&key) {
                Some(ServiceEntry::Active(active)) => return Ok(Some(active.instance.clone())),
                Some(ServiceEntry::Factory(slot)) => Some(slot.clone()),
                None => None,
            }
        };

        match slot {
            Some(slot) => slot.activate(self, key).map(Some),
            None => match &self.inner.parent {
                Some(parent) => parent.get_service(key),
                None => Ok(None),
            },
        }
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("name", &self.name())
            .field("has_parent", &self.has_parent())
            .finish_non_exhaustive()
    }
}

fn resolve_waiters(waiters: Vec<Arc<Promise>>, instance: &ServiceInstance) {
    for waiter in waiters {
        waiter.resolve(instance.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct MessageLog {
        id: usize,
    }

    struct SymbolCache {
        log: Arc<MessageLog>,
    }

    struct Database;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    type DisposalLog = Arc<Mutex<Vec<u8>>>;

    /// `ID`마다 서로 다른 서비스 키가 되는 해제 가능한 서비스
    struct Tracked<const ID: u8> {
        log: DisposalLog,
        fail: bool,
    }

    impl<const ID: u8> Disposable for Tracked<ID> {
        fn dispose(&self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(ID);
            if self.fail {
                Err(format!("service {} refused to stop", ID).into())
            } else {
                Ok(())
            }
        }
    }

    fn tracked<const ID: u8>(log: &DisposalLog) -> Arc<Tracked<ID>> {
        Arc::new(Tracked { log: log.clone(), fail: false })
    }

    fn failing<const ID: u8>(log: &DisposalLog) -> Arc<Tracked<ID>> {
        Arc::new(Tracked { log: log.clone(), fail: true })
    }

    fn disposal_log() -> DisposalLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// 조회 횟수를 세는 부모 공급자
    struct CountingProvider {
        inner: ServiceContainer,
        lookups: AtomicUsize,
    }

    impl ServiceProvider for CountingProvider {
        fn get_service(&self, key: ServiceKey) -> ContainerResult<Option<ServiceInstance>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.get_service(key)
        }
    }

    // --- Registry ---

    #[test]
    fn test_register_rejects_duplicate_key() {
        let container = ServiceContainer::new();
        let first = Arc::new(MessageLog { id: 1 });

        container.register(first.clone()).unwrap();

        let result = container.register(Arc::new(MessageLog { id: 2 }));
        assert!(matches!(result, Err(ContainerError::DuplicateKey(_))));

        let result = container.register_factory(|_| Ok(Arc::new(MessageLog { id: 3 })));
        assert!(matches!(result, Err(ContainerError::DuplicateKey(_))));

        let current = container.require::<MessageLog>().unwrap();
        assert!(Arc::ptr_eq(&current, &first));
    }

    #[test]
    fn test_register_factory_rejects_pending_factory() {
        let container = ServiceContainer::new();

        container.register_factory(|_| Ok(Arc::new(MessageLog { id: 1 }))).unwrap();

        let result = container.register_factory(|_| Ok(Arc::new(MessageLog { id: 2 })));
        assert!(matches!(result, Err(ContainerError::DuplicateKey(_))));

        let result = container.register(Arc::new(MessageLog { id: 3 }));
        assert!(matches!(result, Err(ContainerError::DuplicateKey(_))));
        assert_eq!(container.require::<MessageLog>().unwrap().id, 1);
    }

    #[test]
    fn test_vacant_lookup_without_parent() {
        let container = ServiceContainer::new();

        assert!(container.get::<MessageLog>().unwrap().is_none());
        assert!(matches!(
            container.require::<MessageLog>(),
            Err(ContainerError::NotFound(_))
        ));
    }

    #[test]
    fn test_trait_object_service() {
        let container = ServiceContainer::new();
        let greeter: Arc<dyn Greeter> = Arc::new(English);

        container.register(greeter).unwrap();

        assert_eq!(container.require::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(!container.contains::<English>());
    }

    #[test]
    fn test_remove_returns_detached_instance() {
        let container = ServiceContainer::new();
        container.register(Arc::new(MessageLog { id: 4 })).unwrap();

        let removed = container.remove::<MessageLog>().unwrap();
        assert_eq!(removed.id, 4);
        assert!(!container.contains::<MessageLog>());

        assert!(container.remove::<MessageLog>().is_none());
    }

    #[test]
    fn test_remove_unactivated_factory() {
        let container = ServiceContainer::new();
        container.register_factory(|_| Ok(Arc::new(Database))).unwrap();

        assert!(container.remove::<Database>().is_none());
        assert!(container.get::<Database>().unwrap().is_none());
    }

    #[test]
    fn test_remove_factory_holding_pending_future() {
        let container = ServiceContainer::new();
        let upstream = container.get_future::<Database>();

        container
            .register_factory(move |_| {
                upstream.wait()?;
                Ok(Arc::new(MessageLog { id: 5 }))
            })
            .unwrap();

        let (done, finished) = std::sync::mpsc::channel();
        let worker = {
            let container = container.clone();
            thread::spawn(move || {
                let removed = container.remove::<MessageLog>();
                done.send(removed.is_none()).unwrap();
            })
        };

        assert!(finished.recv_timeout(Duration::from_secs(3)).unwrap());
        worker.join().unwrap();

        // 팩토리와 함께 버려진 대기자는 철회됨
        assert!(!container.contains::<MessageLog>());
        assert!(container.snapshot().is_empty());
    }

    #[test]
    fn test_waiters_stay_pending_after_factory_removed() {
        let container = ServiceContainer::new();
        let future = container.get_future::<Database>();

        container.register_factory(|_| Ok(Arc::new(Database))).unwrap();
        assert!(container.remove::<Database>().is_none());

        let result = future.wait_timeout(Duration::from_millis(20));
        assert!(matches!(result, Err(ContainerError::Timeout(_))));

        let snapshot = container.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].state, ServiceState::Awaited);
        assert_eq!(snapshot[0].waiters, 1);

        container.register(Arc::new(Database)).unwrap();
        assert!(future.wait_timeout(Duration::from_millis(20)).is_ok());
    }

    // --- Activator ---

    #[test]
    fn test_factory_runs_once_under_contention() {
        let container = ServiceContainer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        container
            .register_factory(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Ok(Arc::new(MessageLog { id: 7 }))
            })
            .unwrap();

        let barrier = Barrier::new(8);
        let results: Vec<Arc<MessageLog>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        container.require::<MessageLog>().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|log| Arc::ptr_eq(log, &results[0])));
    }

    #[test]
    fn test_factory_resolves_dependencies_without_deadlock() {
        let container = ServiceContainer::new();
        let logger = Arc::new(MessageLog { id: 1 });
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        container.register(logger.clone()).unwrap();
        container
            .register_factory(move |c| {
                counter.fetch_add(1, Ordering::SeqCst);
                let log = c.require::<MessageLog>()?;
                thread::sleep(Duration::from_millis(20));
                Ok(Arc::new(SymbolCache { log }))
            })
            .unwrap();

        let barrier = Barrier::new(2);
        let (a, b) = thread::scope(|s| {
            let first = s.spawn(|| {
                barrier.wait();
                container.require::<SymbolCache>().unwrap()
            });
            let second = s.spawn(|| {
                barrier.wait();
                container.require::<SymbolCache>().unwrap()
            });
            (first.join().unwrap(), second.join().unwrap())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.log, &logger));
    }

    #[test]
    fn test_failed_activation_reverts_to_vacant() {
        let container = ServiceContainer::new();

        container
            .register_factory::<Database, _>(|_| Err("connection refused".into()))
            .unwrap();

        let result = container.get::<Database>();
        assert!(matches!(result, Err(ContainerError::ActivationFailure { .. })));
        assert!(!container.contains::<Database>());

        // Vacant로 돌아갔으므로 새 팩토리 등록이 가능
        container.register_factory(|_| Ok(Arc::new(Database))).unwrap();
        assert!(container.get::<Database>().unwrap().is_some());
    }

    #[test]
    fn test_concurrent_callers_observe_same_failure() {
        let container = ServiceContainer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        container
            .register_factory::<Database, _>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Err("schema mismatch".into())
            })
            .unwrap();

        let barrier = Barrier::new(4);
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        container.get::<Database>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            match result {
                Err(ContainerError::ActivationFailure { source, .. }) => {
                    assert_eq!(source.to_string(), "schema mismatch");
                }
                other => panic!("Expected ActivationFailure, got {:?}", other.map(|d| d.is_some())),
            }
        }
    }

    #[test]
    fn test_panicking_factory_is_activation_failure() {
        let container = ServiceContainer::new();

        container
            .register_factory::<Database, _>(|_| panic!("disk full"))
            .unwrap();

        match container.get::<Database>() {
            Err(e @ ContainerError::ActivationFailure { .. }) => {
                assert!(e.to_string().contains("factory panicked: disk full"));
            }
            _ => panic!("Expected ActivationFailure"),
        }
        assert!(!container.contains::<Database>());
    }

    #[test]
    fn test_key_removed_during_activation() {
        let container = ServiceContainer::new();

        container
            .register_factory(|c| {
                c.remove::<MessageLog>();
                Ok(Arc::new(MessageLog { id: 9 }))
            })
            .unwrap();

        let log = container.require::<MessageLog>().unwrap();
        assert_eq!(log.id, 9);
        assert!(!container.contains::<MessageLog>());
    }

    // --- Future Resolver ---

    #[test]
    fn test_future_resolves_after_registration() {
        let container = ServiceContainer::new();
        let future = container.get_future::<MessageLog>();

        assert!(!future.is_resolved());
        assert!(future.try_get().unwrap().is_none());

        let log = Arc::new(MessageLog { id: 3 });
        let resolved = thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(20));
                container.register(log.clone()).unwrap();
            });
            future.wait().unwrap()
        });

        assert!(Arc::ptr_eq(&resolved, &log));
    }

    #[test]
    fn test_future_for_active_service_is_ready() {
        let container = ServiceContainer::new();
        container.register(Arc::new(MessageLog { id: 5 })).unwrap();

        let future = container.get_future::<MessageLog>();

        assert!(future.is_resolved());
        assert_eq!(future.try_get().unwrap().unwrap().id, 5);
        assert!(container.snapshot().iter().all(|info| info.waiters == 0));
    }

    #[test]
    fn test_future_waits_for_factory_activation() {
        let container = ServiceContainer::new();
        container.register_factory(|_| Ok(Arc::new(MessageLog { id: 6 }))).unwrap();

        let future = container.get_future::<MessageLog>();
        assert!(!future.is_resolved());

        let log = container.require::<MessageLog>().unwrap();

        assert!(future.is_resolved());
        assert!(Arc::ptr_eq(&future.try_get().unwrap().unwrap(), &log));
    }

    #[test]
    fn test_futures_share_resolved_instance() {
        let container = ServiceContainer::new();
        let first = container.get_future::<MessageLog>();
        let second = container.get_future::<MessageLog>();

        container.register(Arc::new(MessageLog { id: 8 })).unwrap();

        assert!(Arc::ptr_eq(&first.wait().unwrap(), &second.wait().unwrap()));
    }

    #[test]
    fn test_resolved_future_survives_reregistration() {
        let container = ServiceContainer::new();
        let future = container.get_future::<MessageLog>();

        container.register(Arc::new(MessageLog { id: 1 })).unwrap();
        container.remove::<MessageLog>();
        container.register(Arc::new(MessageLog { id: 2 })).unwrap();

        assert_eq!(future.wait().unwrap().id, 1);
        assert_eq!(container.require::<MessageLog>().unwrap().id, 2);
    }

    #[test]
    fn test_cancel_affects_only_one_waiter() {
        let container = ServiceContainer::new();
        let cancelled = container.get_future::<MessageLog>();
        let kept = container.get_future::<MessageLog>();

        cancelled.cancel();
        assert!(matches!(cancelled.wait(), Err(ContainerError::Cancelled(_))));

        let awaited = container.snapshot();
        assert_eq!(awaited.len(), 1);
        assert_eq!(awaited[0].state, ServiceState::Awaited);
        assert_eq!(awaited[0].waiters, 1);

        container.register(Arc::new(MessageLog { id: 2 })).unwrap();
        assert_eq!(kept.wait().unwrap().id, 2);
        assert!(matches!(cancelled.try_get(), Err(ContainerError::Cancelled(_))));
    }

    #[test]
    fn test_dropped_future_withdraws_waiter() {
        let container = ServiceContainer::new();

        {
            let _future = container.get_future::<Database>();
            assert_eq!(container.snapshot()[0].waiters, 1);
        }

        assert!(container.snapshot().is_empty());
    }

    #[test]
    fn test_wait_timeout_on_missing_service() {
        let container = ServiceContainer::new();
        let future = container.get_future::<Database>();

        let result = future.wait_timeout(Duration::from_millis(20));
        assert!(matches!(result, Err(ContainerError::Timeout(_))));

        // 시간 초과 후에도 대기자는 유효
        container.register(Arc::new(Database)).unwrap();
        assert!(future.wait_timeout(Duration::from_millis(20)).is_ok());
    }

    #[test]
    fn test_wait_timeout_with_unbounded_duration() {
        let container = ServiceContainer::new();
        container.register(Arc::new(MessageLog { id: 9 })).unwrap();

        let future = container.get_future::<MessageLog>();
        assert_eq!(future.wait_timeout(Duration::MAX).unwrap().id, 9);

        let pending = container.get_future::<Database>();
        let resolved = thread::scope(|s| {
            let waiter = s.spawn(|| pending.wait_timeout(Duration::MAX));
            thread::sleep(Duration::from_millis(20));
            container.register(Arc::new(Database)).unwrap();
            waiter.join().unwrap()
        });
        assert!(resolved.is_ok());
    }

    #[tokio::test]
    async fn test_future_awaits_registration_from_thread() {
        let container = ServiceContainer::new();
        let future = container.get_future::<MessageLog>();

        let registrar = container.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            registrar.register(Arc::new(MessageLog { id: 11 })).unwrap();
        });

        let log = future.await.unwrap();
        assert_eq!(log.id, 11);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_ready_future_completes_immediately() {
        let container = ServiceContainer::new();
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        container.register(greeter).unwrap();

        let resolved = container.get_future::<dyn Greeter>().await.unwrap();
        assert_eq!(resolved.greet(), "hello");
    }

    // --- Teardown Sequencer ---

    #[test]
    fn test_shutdown_disposes_in_reverse_activation_order() {
        let log = disposal_log();
        let container = ServiceContainer::new();

        let lazy = log.clone();
        container
            .register_disposable_factory(move |_| Ok(tracked::<1>(&lazy)))
            .unwrap();
        container.register_disposable(tracked::<2>(&log)).unwrap();
        container.register(Arc::new(MessageLog { id: 0 })).unwrap();

        // 팩토리는 등록 순서가 아니라 활성화 순서로 기록됨
        container.require::<Tracked<1>>().unwrap();
        container.register_disposable(tracked::<3>(&log)).unwrap();

        container.shutdown().unwrap();

        assert_eq!(*log.lock().unwrap(), vec![3, 1, 2]);
        assert!(!container.contains::<Tracked<1>>());
        assert!(container.contains::<MessageLog>());
    }

    #[test]
    fn test_removed_service_is_not_disposed() {
        let log = disposal_log();
        let container = ServiceContainer::new();

        container.register_disposable(tracked::<1>(&log)).unwrap();
        container.register_disposable(tracked::<2>(&log)).unwrap();

        assert!(container.remove::<Tracked<1>>().is_some());
        container.shutdown().unwrap();

        assert_eq!(*log.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_unactivated_factory_is_not_disposed() {
        let log = disposal_log();
        let container = ServiceContainer::new();

        let lazy = log.clone();
        container
            .register_disposable_factory(move |_| Ok(tracked::<1>(&lazy)))
            .unwrap();

        container.shutdown().unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert!(container.contains::<Tracked<1>>());
    }

    #[test]
    fn test_fail_fast_shutdown_stops_at_first_error() {
        let log = disposal_log();
        let container = ServiceContainer::new();

        container.register_disposable(tracked::<1>(&log)).unwrap();
        container.register_disposable(tracked::<2>(&log)).unwrap();
        container.register_disposable(failing::<3>(&log)).unwrap();

        let result = container.shutdown();
        assert!(matches!(result, Err(ContainerError::DisposalFailure { .. })));
        assert_eq!(*log.lock().unwrap(), vec![3]);
        assert!(container.contains::<Tracked<1>>());

        // 종료 시퀀스가 비워졌으므로 두 번째 호출은 아무것도 해제하지 않음
        container.shutdown().unwrap();
        assert_eq!(*log.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_best_effort_shutdown_collects_errors() {
        let log = disposal_log();
        let config = ContainerConfig::named("best-effort").shutdown_policy(ShutdownPolicy::BestEffort);
        let container = ServiceContainer::with_config(config);

        container.register_disposable(tracked::<1>(&log)).unwrap();
        container.register_disposable(failing::<2>(&log)).unwrap();
        container.register_disposable(tracked::<3>(&log)).unwrap();

        match container.shutdown() {
            Err(ContainerError::ShutdownFailures(failures)) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].to_string().contains("refused to stop"));
            }
            other => panic!("Expected ShutdownFailures, got {:?}", other),
        }
        assert_eq!(*log.lock().unwrap(), vec![3, 2, 1]);
        assert!(!container.contains::<Tracked<1>>());
    }

    // --- Provider Chain ---

    #[test]
    fn test_child_falls_back_to_parent() {
        let parent = ServiceContainer::new();
        let log = Arc::new(MessageLog { id: 1 });
        parent.register(log.clone()).unwrap();

        let child = parent.child("window-1");

        assert!(Arc::ptr_eq(&child.require::<MessageLog>().unwrap(), &log));
        assert!(!child.contains::<MessageLog>());
        assert!(child.get::<Database>().unwrap().is_none());
    }

    #[test]
    fn test_local_factory_shadows_parent() {
        let parent = ServiceContainer::new();
        parent.register(Arc::new(MessageLog { id: 1 })).unwrap();

        let provider = Arc::new(CountingProvider {
            inner: parent,
            lookups: AtomicUsize::new(0),
        });
        let child = ServiceContainer::with_parent(ContainerConfig::named("window"), provider.clone());

        child.register_factory(|_| Ok(Arc::new(MessageLog { id: 2 }))).unwrap();
        assert!(child.contains::<MessageLog>());
        assert_eq!(child.require::<MessageLog>().unwrap().id, 2);
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 0);

        assert!(child.get::<Database>().unwrap().is_none());
        assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parent_activation_failure_propagates_to_child() {
        let parent = ServiceContainer::new();
        parent
            .register_factory::<Database, _>(|_| Err("no route to host".into()))
            .unwrap();

        let child = parent.child("session");

        assert!(matches!(
            child.get::<Database>(),
            Err(ContainerError::ActivationFailure { .. })
        ));
    }

    #[test]
    fn test_child_writes_stay_local() {
        let parent = ServiceContainer::new();
        parent.register(Arc::new(MessageLog { id: 1 })).unwrap();
        let child = parent.child("window");

        child.register(Arc::new(Database)).unwrap();
        assert!(parent.get::<Database>().unwrap().is_none());

        // get_future는 부모로 위임되지 않음
        let future = child.get_future::<MessageLog>();
        assert!(!future.is_resolved());

        // 자식의 제거는 부모 엔트리에 영향 없음
        assert!(child.remove::<MessageLog>().is_none());
        assert!(parent.contains::<MessageLog>());
    }

    // --- Diagnostics ---

    #[test]
    fn test_snapshot_orders_by_activation() {
        let log = disposal_log();
        let container = ServiceContainer::new();

        container.register_factory(|_| Ok(Arc::new(Database))).unwrap();
        container.register_disposable(tracked::<1>(&log)).unwrap();
        container.register(Arc::new(MessageLog { id: 1 })).unwrap();

        let infos = container.snapshot();
        let states: Vec<_> = infos.iter().map(|info| (info.key, info.state)).collect();

        assert_eq!(
            states,
            vec![
                ("Tracked<1>", ServiceState::Active),
                ("MessageLog", ServiceState::Active),
                ("Database", ServiceState::Factory),
            ]
        );
        assert!(infos[0].disposable);
        assert_eq!(infos[0].sequence, Some(1));
        assert_eq!(infos[1].sequence, Some(2));

        let json = serde_json::to_value(&infos).unwrap();
        assert_eq!(json[2]["state"], "factory");
    }
}
