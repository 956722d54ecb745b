//! # Core Container Module
//!
//! 호스트 전체가 공유하는 서비스 컨테이너의 핵심 구현입니다.
//! 확장 모듈들은 서로를 직접 참조하지 않고, 이 모듈의 공개 계약
//! (`register`, `get`, `get_future`, `remove`, `shutdown`)만으로 서비스를 주고받습니다.
//!
//! ## 모듈 구성
//!
//! - [`registry`] - `ServiceContainer`: 등록, 조회, 제거, 종료, 부모 위임
//! - [`activator`] - 팩토리 엔트리의 키 단위 1회 활성화
//! - [`future`] - 아직 없는 서비스를 기다리는 `ServiceFuture`
//! - [`service`] - 타입 소거된 `ServiceInstance`와 `Disposable` 기능
//! - [`provider`] - 부모 위임 계약 `ServiceProvider`
//! - [`key`] - 서비스 계약 식별자 `ServiceKey`
//! - [`errors`] - `ContainerError`
//!
//! ## 범위
//!
//! 이 컨테이너는 범용 DI 프레임워크가 아닙니다. 생성자 주입이나 의존성 그래프 자동 해석,
//! 팩토리 간 순환 감지는 제공하지 않습니다. 팩토리는 인자로 받은 컨테이너에서 필요한
//! 서비스를 직접 조회합니다.
//!
//! ## 사용 패턴
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use service_container::core::{Disposable, ServiceContainer, BoxError};
//!
//! struct OutputPad { /* ... */ }
//!
//! impl Disposable for OutputPad {
//!     fn dispose(&self) -> Result<(), BoxError> {
//!         self.flush()?;
//!         Ok(())
//!     }
//! }
//!
//! let host = ServiceContainer::new();
//! host.register_disposable_factory(|_| Ok(Arc::new(OutputPad::open()?)))?;
//!
//! // 아직 활성화되지 않은 서비스를 백그라운드에서 기다림
//! let pad = host.get_future::<OutputPad>();
//! std::thread::spawn(move || pad.wait().map(|pad| pad.append("ready")));
//!
//! host.require::<OutputPad>()?;   // 팩토리 실행, 대기자 해결
//! host.shutdown()?;               // OutputPad::dispose()
//! ```

pub mod activator;
pub mod errors;
pub mod future;
pub mod key;
pub mod provider;
pub mod registry;
pub mod service;

pub use errors::*;
pub use future::ServiceFuture;
pub use key::ServiceKey;
pub use provider::ServiceProvider;
pub use registry::{ServiceContainer, ServiceInfo, ServiceState};
pub use service::{Disposable, ServiceInstance};
