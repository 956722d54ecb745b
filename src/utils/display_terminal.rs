//! 터미널 출력 포맷팅 유틸리티
//!
//! 호스트 시작과 종료 과정에서 컨테이너 상태를 사람이 읽기 좋은 형태로 출력합니다.

use crate::core::errors::ContainerResult;
use crate::core::registry::{ServiceInfo, ServiceState};

const CONTENT_WIDTH: usize = 50;

/// 박스 형태로 둘러싸인 제목을 출력합니다
///
/// Output:
/// ```text
/// ╔══════════════════════════════════════════════════╗
/// ║                   HOST STARTED                   ║
/// ╚══════════════════════════════════════════════════╝
/// ```
pub fn print_boxed_title(title: &str) {
    let border = "═".repeat(CONTENT_WIDTH);

    println!("╔{}╗", border);
    println!("║{:^width$}║", title, width = CONTENT_WIDTH);
    println!("╚{}╝", border);
}

/// 진행 단계 시작을 표시합니다
pub fn print_step_start(step: u8, description: &str) {
    println!("→ Step {}: {}", step, description);
}

/// 진행 단계 완료를 표시합니다
pub fn print_step_complete(step: u8, description: &str, count: usize) {
    println!("✓ Step {}: {} ({} services)", step, description, count);
}

/// 컨테이너의 서비스 목록을 트리 형태로 출력합니다
///
/// # Arguments
///
/// * `container_name` - 컨테이너 이름
/// * `services` - `ServiceContainer::snapshot()` 결과
///
/// Output:
/// ```text
/// 📦 root (3 services)
///    ├─ #1 MessageLog: active
///    ├─ #2 SymbolCache: active, disposable
///    └─ Formatter: factory
/// ```
pub fn print_service_table(container_name: &str, services: &[ServiceInfo]) {
    println!("📦 {} ({} services)", container_name, services.len());

    for (index, info) in services.iter().enumerate() {
        let branch = if index + 1 == services.len() { "└─" } else { "├─" };
        println!("   {} {}", branch, describe(info));
    }
}

fn describe(info: &ServiceInfo) -> String {
    let mut line = match info.sequence {
        Some(sequence) => format!("#{} {}", sequence, info.key),
        None => info.key.to_string(),
    };

    let state = match info.state {
        ServiceState::Factory => "factory",
        ServiceState::Active => "active",
        ServiceState::Awaited => "awaited",
    };
    line.push_str(": ");
    line.push_str(state);

    if info.disposable {
        line.push_str(", disposable");
    }
    if info.waiters > 0 {
        line.push_str(&format!(", {} waiter(s)", info.waiters));
    }

    line
}

/// 종료 결과를 출력합니다
pub fn print_shutdown_summary(container_name: &str, result: &ContainerResult<()>) {
    match result {
        Ok(()) => println!("   ├─ {}: ✓ shut down", container_name),
        Err(e) => println!("   ├─ {}: ✗ {}", container_name, e),
    }
}
