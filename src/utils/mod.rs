//! 공통 유틸리티 함수 모듈
//!
//! # Modules
//!
//! - [`display_terminal`] - 컨테이너 시작/종료 보고용 터미널 출력 함수들

pub mod display_terminal;
