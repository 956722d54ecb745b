//! # Configuration Module
//!
//! 서비스 컨테이너와 호스트 프로세스의 설정을 환경 변수 기반으로 관리합니다.
//!
//! ## 모듈 구성
//!
//! - [`container_config`] - 컨테이너 이름, 종료 정책, 실행 환경, 로깅 필터
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use service_container::config::{ContainerConfig, Environment, LoggingConfig};
//!
//! let env = Environment::current();
//! let filter = LoggingConfig::default_filter();
//! let config = ContainerConfig::from_env();
//! ```

pub mod container_config;

pub use container_config::*;
