//! 상위 컨테이너 위임(Provider Chain)을 위한 조회 계약

use crate::core::errors::ContainerResult;
use crate::core::key::ServiceKey;
use crate::core::service::ServiceInstance;

/// 키로 서비스를 조회할 수 있는 읽기 전용 공급자
///
/// `ServiceContainer`가 이 트레이트를 구현하며, 자식 컨테이너는 로컬에 키가
/// 전혀 없을 때(Vacant)에만 부모 공급자에게 조회를 위임합니다.
/// 쓰기 연산(`register`, `remove`, `get_future`)은 위임되지 않습니다.
///
/// 부모가 없음을 의미하는 `Ok(None)`과 팩토리 실패(`Err`)는 구분되어 전파됩니다.
pub trait ServiceProvider: Send + Sync {
    fn get_service(&self, key: ServiceKey) -> ContainerResult<Option<ServiceInstance>>;
}
