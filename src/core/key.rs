//! 서비스 계약을 식별하는 키

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 서비스 계약(타입 토큰)을 식별하는 불투명한 키
///
/// `TypeId`로만 비교하며, `type_name`은 로그와 진단 출력에만 사용합니다.
/// 트레이트 객체(`dyn Trait`)도 키가 될 수 있습니다.
///
/// # Examples
///
/// ```rust,ignore
/// use service_container::core::key::ServiceKey;
///
/// let key = ServiceKey::of::<dyn MessageLog>();
/// assert_eq!(key.short_name(), "MessageLog");
/// ```
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// 전체 경로를 포함한 타입 이름
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 모듈 경로를 제거한 타입 이름 (`app::log::FileLog` -> `FileLog`)
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
