//! 개발 환경 호스트 조합 루트
//!
//! 프로세스 전역 서비스 컨테이너를 만들고 호스트 서비스를 등록한 뒤,
//! 창(window) 단위 자식 컨테이너를 열고 닫는 전체 수명 주기를 실행합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use service_container::config::{ContainerConfig, LoggingConfig};
use service_container::core::{BoxError, ContainerError, Disposable, ServiceContainer};
use service_container::utils::display_terminal::{
    print_boxed_title, print_service_table, print_shutdown_summary, print_step_complete, print_step_start,
};

/// 호스트 전체가 공유하는 메시지 로그
trait MessageLog: Send + Sync {
    fn append(&self, category: &str, message: &str);
}

#[derive(Default)]
struct ConsoleLog {
    lines: AtomicUsize,
}

impl MessageLog for ConsoleLog {
    fn append(&self, category: &str, message: &str) {
        let line = self.lines.fetch_add(1, Ordering::Relaxed) + 1;
        info!("{:>4} [{}] {}", line, category, message);
    }
}

/// 지연 생성되는 심볼 캐시, 종료 시 해제
struct SymbolCache {
    log: Arc<dyn MessageLog>,
}

impl SymbolCache {
    fn open(log: Arc<dyn MessageLog>) -> Self {
        log.append("symbols", "symbol cache opened");
        Self { log }
    }
}

impl Disposable for SymbolCache {
    fn dispose(&self) -> Result<(), BoxError> {
        self.log.append("symbols", "symbol cache flushed");
        Ok(())
    }
}

/// 백그라운드 스레드에서 늦게 등록되는 프로파일러 세션
struct ProfilerSession;

impl Disposable for ProfilerSession {
    fn dispose(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 창마다 하나씩 존재하는 열린 문서 목록
struct DocumentTracker {
    open: Vec<String>,
}

impl Disposable for DocumentTracker {
    fn dispose(&self) -> Result<(), BoxError> {
        info!("Closing {} document(s)", self.open.len());
        Ok(())
    }
}

fn main() -> Result<(), ContainerError> {
    load_env_file();
    init_logging();

    print_boxed_title("🔄 STARTING DEVELOPMENT HOST");

    let host = ServiceContainer::with_config(ContainerConfig::from_env());
    register_host_services(&host)?;

    // 프로파일러는 백그라운드 초기화 스레드에서 등록됨
    let profiler = host.get_future::<ProfilerSession>();
    let initializer = {
        let host = host.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            host.register_disposable(Arc::new(ProfilerSession))
        })
    };

    let window = open_window(&host)?;

    profiler.wait_timeout(Duration::from_secs(5))?;
    match initializer.join() {
        Ok(result) => result?,
        Err(_) => error!("Profiler initializer thread panicked"),
    }

    let log = window.require::<dyn MessageLog>()?;
    log.append("host", "all services ready");

    print_service_table(host.name(), &host.snapshot());
    print_service_table(window.name(), &window.snapshot());

    match serde_json::to_string_pretty(&host.snapshot()) {
        Ok(json) => info!("Host services:\n{}", json),
        Err(e) => error!("Failed to serialize service snapshot: {}", e),
    }

    print_boxed_title("🛑 SHUTTING DOWN");
    let window_result = window.shutdown();
    print_shutdown_summary(window.name(), &window_result);
    let host_result = host.shutdown();
    print_shutdown_summary(host.name(), &host_result);

    window_result.and(host_result)
}

/// 프로세스 전역 서비스를 등록합니다
///
/// 메시지 로그는 즉시 등록하고, 심볼 캐시는 첫 조회 시점에 생성되도록 팩토리로 등록합니다.
fn register_host_services(host: &ServiceContainer) -> Result<(), ContainerError> {
    print_step_start(1, "Registering host services");

    let log: Arc<dyn MessageLog> = Arc::new(ConsoleLog::default());
    host.register(log)?;
    host.register_disposable_factory(|c| {
        let log = c.require::<dyn MessageLog>()?;
        Ok(Arc::new(SymbolCache::open(log)))
    })?;

    print_step_complete(1, "Host services registered", host.snapshot().len());
    Ok(())
}

/// 창 단위 자식 컨테이너를 엽니다
///
/// 창 컨테이너에 없는 서비스(심볼 캐시 등)는 호스트 컨테이너에서 조회됩니다.
fn open_window(host: &ServiceContainer) -> Result<ServiceContainer, ContainerError> {
    print_step_start(2, "Opening window");

    let window = host.child("window-1");
    window.register_disposable(Arc::new(DocumentTracker {
        open: vec!["Program.cs".to_string(), "MainForm.cs".to_string()],
    }))?;

    let symbols = window.require::<SymbolCache>()?;
    symbols.log.append("window-1", "symbol cache resolved through host");

    print_step_complete(2, "Window opened", window.snapshot().len());
    Ok(window)
}

/// 환경별 설정 파일을 로드합니다
///
/// # Environment Variables
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    let loaded = match profile.as_str() {
        "prod" => dotenv::from_filename(".env.prod").map(|_| ".env.prod"),
        "dev" => dotenv::from_filename(".env.dev").map(|_| ".env.dev"),
        _ => dotenv().map(|_| ".env"),
    };

    // 로거 초기화 전이므로 결과는 stderr로 남김
    match loaded {
        Ok(file) => eprintln!("Loaded {} (profile: {})", file, profile),
        Err(e) => eprintln!("No env file for profile {}: {}", profile, e),
    }
}

/// 로깅 시스템을 초기화합니다
///
/// `RUST_LOG`이 없으면 `ENVIRONMENT`에 따른 기본 필터를 사용합니다.
///
/// ```bash
/// RUST_LOG=service_container::core=debug cargo run
/// ```
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or(LoggingConfig::default_filter()));
}
