//! 프로세스 단위 서비스 컨테이너
//!
//! 여러 확장(에디터, 디자이너, 프로파일러, 패키지 관리 도구)으로 구성된 데스크톱 개발 환경에서
//! 공유 서비스를 등록, 조회, 지연 생성, 비동기 대기, 순서 있는 해제까지 관리하는 컨테이너입니다.
//! UI 스레드와 백그라운드 초기화 스레드가 동시에 접근해도 안전합니다.
//!
//! # Features
//!
//! - **즉시/지연 등록**: 준비된 인스턴스 또는 첫 조회 시 한 번만 실행되는 팩토리
//! - **키 단위 활성화**: 관계없는 서비스는 서로를 기다리지 않음
//! - **Future 조회**: 아직 등록되지 않은 서비스를 블로킹 또는 `async`로 대기
//! - **역순 해제**: 활성화의 역순으로 `Disposable` 서비스 해제
//! - **부모 위임**: 창/세션별 자식 컨테이너가 프로세스 전역 컨테이너로 조회 위임
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Extensions (AddIns) │ ← register / get / get_future / remove
//! └──────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐      miss      ┌──────────────────────┐
//! │ window container     │ ─────────────▶ │ host container       │
//! └──────────────────────┘                └──────────────────────┘
//!            │                                       │
//!            ▼                                       ▼
//!   Registry ─ Activator ─ Waiters ─ Teardown (core 모듈)
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use service_container::core::ServiceContainer;
//!
//! let host = ServiceContainer::new();
//! host.register(Arc::new(MessageLog::default()))?;
//! host.register_factory(|c| Ok(Arc::new(SymbolCache::new(c.require::<MessageLog>()?))))?;
//!
//! let cache = host.require::<SymbolCache>()?;
//! host.shutdown()?;
//! ```

pub mod config;
pub mod core;
pub mod utils;
