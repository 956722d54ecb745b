//! # Service Activator
//!
//! 팩토리 엔트리를 활성 인스턴스로 바꾸는 키 단위 활성화 슬롯입니다.
//!
//! 각 팩토리 엔트리는 자신만의 `OnceCell`을 가지므로 활성화 잠금은 키 단위입니다.
//! 서로 다른 키는 동시에 활성화될 수 있고, 팩토리가 다른 서비스를 조회하기 위해
//! 컨테이너에 재진입해도 레지스트리 잠금을 잡고 있지 않으므로 교착되지 않습니다.
//!
//! ## 동작 순서
//!
//! ```text
//! get(K) ─▶ 레지스트리 읽기 잠금에서 Factory(slot) 확인 후 잠금 해제
//!        ─▶ slot.activate()
//!             ├─ 최초 호출자: 팩토리 실행 → 레지스트리 쓰기 잠금에서 Active 전이 / 실패 시 Vacant 복귀
//!             └─ 동시 호출자: OnceCell 초기화 완료까지 대기 후 같은 결과(성공 또는 실패)를 받음
//! ```
//!
//! 같은 키의 팩토리가 자기 자신을 다시 조회하면 `OnceCell` 재진입으로 교착됩니다.
//! 순환 감지는 하지 않습니다.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use once_cell::sync::OnceCell;

use crate::core::errors::{BoxError, ContainerError, ContainerResult};
use crate::core::key::ServiceKey;
use crate::core::registry::ServiceContainer;
use crate::core::service::ServiceInstance;

pub(crate) type ServiceFactory =
    Box<dyn FnOnce(&ServiceContainer) -> Result<ServiceInstance, BoxError> + Send>;

/// 아직 실행되지 않은 팩토리와 그 활성화 결과
pub(crate) struct ActivationSlot {
    factory: Mutex<Option<ServiceFactory>>,
    outcome: OnceCell<ContainerResult<ServiceInstance>>,
}

impl ActivationSlot {
    pub(crate) fn new(factory: ServiceFactory) -> Arc<Self> {
        Arc::new(Self {
            factory: Mutex::new(Some(factory)),
            outcome: OnceCell::new(),
        })
    }

    /// 팩토리를 최대 한 번 실행하고 결과를 돌려줍니다.
    ///
    /// 결과는 슬롯에 남으므로, 실행 중에 대기하던 호출자와 이후에 같은 슬롯을
    /// 집어든 호출자 모두 동일한 인스턴스 또는 동일한 `ActivationFailure`를 받습니다.
    pub(crate) fn activate(
        self: &Arc<Self>,
        container: &ServiceContainer,
        key: ServiceKey,
    ) -> ContainerResult<ServiceInstance> {
        self.outcome
            .get_or_init(|| {
                let result = self.invoke(container, key);
                container.complete_activation(key, self, result)
            })
            .clone()
    }

    fn invoke(&self, container: &ServiceContainer, key: ServiceKey) -> ContainerResult<ServiceInstance> {
        let factory = self
            .factory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(factory) = factory else {
            return Err(ContainerError::activation(key, "factory already consumed".into()));
        };

        debug!("[{}] Service startup: {}", container.name(), key);

        match catch_unwind(AssertUnwindSafe(|| factory(container))) {
            Ok(Ok(instance)) => Ok(instance),
            Ok(Err(e)) => {
                warn!("[{}] Factory for {} failed: {}", container.name(), key, e);
                Err(ContainerError::activation(key, e))
            }
            Err(payload) => {
                let error = ContainerError::activation_panic(key, payload);
                warn!("[{}] {}", container.name(), error);
                Err(error)
            }
        }
    }
}
