use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::history::{HistoryEntry, RunHistory};
use crate::agent::report::{TestReport, TestStatus};
use crate::agent::stats::{RunStats, StatsSummary};
use crate::config::AgentConfig;
use crate::device::action::{self, parse_step, StepAction, SWIPE_DURATION_MS};
use crate::device::Device;
use crate::errors::{TapSightError, TapSightResult};
use crate::perception::image_prep::encode_for_api;
use crate::perception::types::{PixelPoint, Point, ScreenSize};
use crate::vision::prompts;
use crate::vision::provider::VisionProvider;
use crate::vision::types::NavigationHint;

/// Orchestrates one test run at a time: capture the screen, locate the
/// target element through the vision model, drive the device.
pub struct TestEngine {
    device: Arc<dyn Device>,
    vision: Arc<dyn VisionProvider>,
    config: AgentConfig,
    screenshot_path: PathBuf,
    stats: RunStats,
    /// Base64 JPEG of the most recently captured screen.
    frame: Option<String>,
}

impl TestEngine {
    pub fn new(
        device: Arc<dyn Device>,
        vision: Arc<dyn VisionProvider>,
        config: AgentConfig,
        screenshot_path: PathBuf,
    ) -> Self {
        Self {
            device,
            vision,
            config,
            screenshot_path,
            stats: RunStats::new(),
            frame: None,
        }
    }

    pub fn screen_size(&self) -> ScreenSize {
        self.device.screen_size()
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    pub fn vision_name(&self) -> &str {
        self.vision.name()
    }

    pub fn intelligent_mode(&self) -> bool {
        self.config.intelligent_mode
    }

    pub fn stats_summary(&self) -> StatsSummary {
        self.stats.summary()
    }

    // ── Test case execution ───────────────────────────────────────────────

    pub async fn run_case(&mut self, app_name: &str, steps: &[String]) -> TestReport {
        let mut history = RunHistory::new();
        tracing::info!(
            app = app_name,
            run = %history.run_id,
            steps = steps.len(),
            "test case started"
        );
        self.stats.start_run();

        let mut completed = 0u32;
        let mut failed_step = None;

        for (idx, step) in steps.iter().enumerate() {
            tracing::info!(step = idx + 1, total = steps.len(), text = %step, "executing step");
            if self.execute_step(step, &mut history).await {
                completed += 1;
            } else {
                tracing::warn!(step = idx + 1, text = %step, "step failed, aborting run");
                failed_step = Some(step.clone());
                break;
            }
            if idx + 1 < steps.len() && self.config.step_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.step_pause_ms)).await;
            }
        }

        self.stats.end_run();
        self.stats.log_summary(app_name);

        let status = if completed as usize == steps.len() {
            TestStatus::Success
        } else {
            TestStatus::Failed
        };

        TestReport {
            run_id: history.run_id.clone(),
            status,
            completed_steps: completed,
            total_steps: steps.len() as u32,
            failed_step,
            finished_at: chrono::Utc::now(),
            statistics: self.stats.summary(),
        }
    }

    async fn execute_step(&mut self, step: &str, history: &mut RunHistory) -> bool {
        if let Err(e) = self.capture_frame().await {
            tracing::error!(error = %e, "screen capture failed");
            return false;
        }

        let step_action = parse_step(step);

        let pixel = if action::needs_location(&step_action) {
            let located = if self.config.intelligent_mode {
                self.locate_with_navigation(step).await
            } else {
                self.locate_once(step).await
            };
            match located {
                Some(point) => Some(point.to_pixels(self.device.screen_size())),
                None => {
                    tracing::error!(step, "could not locate element");
                    self.stats.record_action(false);
                    self.push_history(
                        history,
                        step,
                        &step_action,
                        false,
                        Some("element not located".into()),
                    );
                    return false;
                }
            }
        } else {
            None
        };

        let ok = self.perform(&step_action, pixel).await;
        self.stats.record_action(ok);
        self.push_history(history, step, &step_action, ok, None);
        ok
    }

    // ── Element location ──────────────────────────────────────────────────

    /// Bounded locate loop with auto-navigation:
    /// miss → visibility probe → (visible: retry) / (hidden: ask for a
    /// navigation action, run it, recapture, retry).
    async fn locate_with_navigation(&mut self, target: &str) -> Option<Point> {
        let attempts = self.config.max_locate_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(point) = self.locate_once(target).await {
                return Some(point);
            }
            if attempt == attempts {
                break;
            }
            tracing::info!(element = %target, attempt, attempts, "element not found");

            if self.check_visibility(target).await {
                tracing::info!(element = %target, "element reported visible, retrying location");
                continue;
            }

            match self.request_navigation(target).await {
                Some(NavigationHint::Action(nav)) => {
                    tracing::info!(action = %nav, "navigation suggested");
                    self.stats.record_navigation();
                    if self.execute_navigation(&nav).await {
                        if self.config.settle_ms > 0 {
                            tokio::time::sleep(Duration::from_millis(self.config.settle_ms))
                                .await;
                        }
                        if self.capture_frame().await.is_err() {
                            break;
                        }
                    } else {
                        tracing::warn!(action = %nav, "navigation action failed");
                    }
                }
                Some(NavigationHint::NotPossible) => {
                    tracing::info!(element = %target, "navigation judged not possible");
                    break;
                }
                None => break,
            }
        }
        None
    }

    async fn locate_once(&mut self, target: &str) -> Option<Point> {
        let frame = self.frame.clone().unwrap_or_default();
        self.stats.record_point_call();
        match self.vision.locate(&frame, target).await {
            Ok(point) => point,
            Err(e) => {
                tracing::error!(error = %e, element = %target, "locate call failed");
                None
            }
        }
    }

    async fn check_visibility(&mut self, target: &str) -> bool {
        let frame = self.frame.clone().unwrap_or_default();
        let question = prompts::visibility_question(target);
        self.stats.record_query_call();
        match self.vision.query(&frame, &question).await {
            Ok(answer) => {
                self.stats.record_reasoning_call();
                prompts::is_affirmative(&answer)
            }
            Err(e) => {
                tracing::warn!(error = %e, element = %target, "visibility check failed");
                false
            }
        }
    }

    async fn request_navigation(&mut self, goal: &str) -> Option<NavigationHint> {
        let frame = self.frame.clone().unwrap_or_default();
        let question = prompts::navigation_question(goal);
        self.stats.record_query_call();
        match self.vision.query(&frame, &question).await {
            Ok(answer) => {
                self.stats.record_reasoning_call();
                let hint = prompts::parse_navigation_answer(&answer);
                if hint.is_none() {
                    tracing::warn!(answer = %answer, "unusable navigation answer");
                }
                hint
            }
            Err(e) => {
                tracing::warn!(error = %e, goal, "navigation request failed");
                None
            }
        }
    }

    /// Run a suggested navigation action. A "click <element>" suggestion
    /// gets its own location pass on the current frame.
    async fn execute_navigation(&mut self, nav: &str) -> bool {
        let nav_action = parse_step(nav);
        match &nav_action {
            StepAction::Tap => {
                let target = strip_click_prefix(nav);
                match self.locate_once(target).await {
                    Some(point) => {
                        let pixel = point.to_pixels(self.device.screen_size());
                        self.perform(&nav_action, Some(pixel)).await
                    }
                    None => false,
                }
            }
            _ => self.perform(&nav_action, None).await,
        }
    }

    // ── Action dispatch ───────────────────────────────────────────────────

    async fn perform(&self, step_action: &StepAction, pixel: Option<PixelPoint>) -> bool {
        match self.dispatch(step_action, pixel).await {
            Ok(()) => {
                tracing::info!(?step_action, "action complete");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, ?step_action, "action failed");
                false
            }
        }
    }

    async fn dispatch(
        &self,
        step_action: &StepAction,
        pixel: Option<PixelPoint>,
    ) -> TapSightResult<()> {
        match step_action {
            StepAction::Tap => {
                let point = pixel.ok_or_else(|| {
                    TapSightError::Agent("tap without located coordinates".into())
                })?;
                self.device.tap(point).await
            }
            StepAction::TypeText { text } => self.device.type_text(text).await,
            StepAction::Scroll { direction } => {
                let (from, to) = action::swipe_gesture(*direction, self.device.screen_size());
                self.device.swipe(from, to, SWIPE_DURATION_MS).await
            }
            StepAction::KeyPress { key } => self.device.key_press(*key).await,
            StepAction::Wait { seconds } => {
                tokio::time::sleep(Duration::from_secs_f64(*seconds)).await;
                Ok(())
            }
        }
    }

    // ── Screen helpers (surfaced over HTTP) ───────────────────────────────

    pub async fn query_screen(&mut self, question: &str) -> TapSightResult<String> {
        self.capture_frame().await?;
        let frame = self.frame.clone().unwrap_or_default();
        self.stats.record_query_call();
        self.vision.query(&frame, question).await
    }

    pub async fn validate_screen(&mut self, expectation: &str) -> TapSightResult<bool> {
        let question = prompts::validation_question(expectation);
        let answer = self.query_screen(&question).await?;
        Ok(prompts::is_affirmative(&answer))
    }

    /// Capture the current screen to the configured path.
    pub async fn capture_to_file(&mut self) -> TapSightResult<PathBuf> {
        let bytes = self.device.capture_screen().await?;
        tokio::fs::write(&self.screenshot_path, &bytes).await?;
        Ok(self.screenshot_path.clone())
    }

    async fn capture_frame(&mut self) -> TapSightResult<()> {
        let bytes = self.device.capture_screen().await?;
        // The on-disk copy is for /screen and debugging; the run proceeds
        // even if it cannot be written.
        if let Err(e) = tokio::fs::write(&self.screenshot_path, &bytes).await {
            tracing::warn!(error = %e, path = %self.screenshot_path.display(), "could not persist screenshot");
        }
        self.frame = Some(encode_for_api(&bytes)?);
        Ok(())
    }

    fn push_history(
        &self,
        history: &mut RunHistory,
        step: &str,
        step_action: &StepAction,
        success: bool,
        detail: Option<String>,
    ) {
        history.push(HistoryEntry {
            ts: chrono::Utc::now().timestamp_millis(),
            step: step.to_string(),
            action: serde_json::to_value(step_action).ok(),
            success,
            detail,
        });
        let _ = history.flush();
    }
}

fn strip_click_prefix(nav: &str) -> &str {
    let trimmed = nav.trim();
    for prefix in ["click on ", "click ", "tap on ", "tap "] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use crate::device::action::Key;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1080,
        height: 2400,
    };

    #[derive(Default)]
    struct MockDevice {
        taps: StdMutex<Vec<PixelPoint>>,
        swipes: StdMutex<Vec<(PixelPoint, PixelPoint)>>,
        typed: StdMutex<Vec<String>>,
        keys: StdMutex<Vec<Key>>,
    }

    #[async_trait::async_trait]
    impl Device for MockDevice {
        fn name(&self) -> &str {
            "mock"
        }

        fn screen_size(&self) -> ScreenSize {
            SCREEN
        }

        async fn capture_screen(&self) -> TapSightResult<Vec<u8>> {
            Ok(tiny_png())
        }

        async fn tap(&self, point: PixelPoint) -> TapSightResult<()> {
            self.taps.lock().unwrap().push(point);
            Ok(())
        }

        async fn swipe(
            &self,
            from: PixelPoint,
            to: PixelPoint,
            _duration_ms: u32,
        ) -> TapSightResult<()> {
            self.swipes.lock().unwrap().push((from, to));
            Ok(())
        }

        async fn type_text(&self, text: &str) -> TapSightResult<()> {
            self.typed.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn key_press(&self, key: Key) -> TapSightResult<()> {
            self.keys.lock().unwrap().push(key);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockVision {
        locate_results: StdMutex<VecDeque<Option<Point>>>,
        query_answers: StdMutex<VecDeque<String>>,
        locate_calls: AtomicUsize,
    }

    impl MockVision {
        fn with_locates(results: Vec<Option<Point>>) -> Self {
            Self {
                locate_results: StdMutex::new(results.into()),
                ..Self::default()
            }
        }

        fn queued_queries(mut self, answers: Vec<&str>) -> Self {
            self.query_answers =
                StdMutex::new(answers.into_iter().map(String::from).collect());
            self
        }
    }

    #[async_trait::async_trait]
    impl VisionProvider for MockVision {
        fn name(&self) -> &str {
            "mock-vision"
        }

        async fn query(&self, _image: &str, _question: &str) -> TapSightResult<String> {
            Ok(self
                .query_answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "no".to_string()))
        }

        async fn locate(&self, _image: &str, _object: &str) -> TapSightResult<Option<Point>> {
            self.locate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .locate_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(None))
        }
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([0, 0, 0, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn test_engine(device: Arc<MockDevice>, vision: Arc<MockVision>) -> TestEngine {
        let path = std::env::temp_dir().join(format!(
            "tapsight_test_{}.png",
            uuid::Uuid::new_v4()
        ));
        TestEngine::new(
            device,
            vision,
            AgentConfig {
                intelligent_mode: true,
                max_locate_attempts: 3,
                step_pause_ms: 0,
                settle_ms: 0,
            },
            path,
        )
    }

    #[tokio::test]
    async fn gesture_steps_run_without_any_vision_calls() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(MockVision::default());
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("Gestures", &["scroll down".to_string(), "press back".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Success);
        assert_eq!(report.completed_steps, 2);
        assert_eq!(report.statistics.actions.total, 2);
        assert_eq!(report.statistics.api_calls.total, 0);
        assert_eq!(device.swipes.lock().unwrap().len(), 1);
        assert_eq!(device.keys.lock().unwrap().as_slice(), &[Key::Back]);
    }

    #[tokio::test]
    async fn tap_step_taps_the_located_point() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(MockVision::with_locates(vec![Some(Point::new(0.5, 0.5))]));
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("Tap", &["click search icon".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Success);
        assert_eq!(
            device.taps.lock().unwrap().as_slice(),
            &[PixelPoint { x: 540, y: 1200 }]
        );
        assert_eq!(report.statistics.api_calls.point, 1);
    }

    #[tokio::test]
    async fn hidden_element_triggers_navigation_then_retry() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(
            MockVision::with_locates(vec![None, Some(Point::new(0.2, 0.8))])
                .queued_queries(vec!["no", "scroll down"]),
        );
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("Navigate", &["click settings".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Success);
        assert_eq!(device.swipes.lock().unwrap().len(), 1);
        assert_eq!(device.taps.lock().unwrap().len(), 1);
        assert_eq!(report.statistics.navigation.auto_navigations, 1);
        assert_eq!(report.statistics.api_calls.point, 2);
        assert_eq!(report.statistics.api_calls.reasoning, 2);
    }

    #[tokio::test]
    async fn visible_element_retries_without_navigating() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(
            MockVision::with_locates(vec![None, Some(Point::new(0.1, 0.1))])
                .queued_queries(vec!["yes"]),
        );
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine.run_case("Retry", &["click send".to_string()]).await;

        assert_eq!(report.status, TestStatus::Success);
        assert!(device.swipes.lock().unwrap().is_empty());
        assert_eq!(report.statistics.navigation.auto_navigations, 0);
        assert_eq!(report.statistics.api_calls.point, 2);
    }

    #[tokio::test]
    async fn not_possible_aborts_the_loop_early() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(
            MockVision::with_locates(vec![None])
                .queued_queries(vec!["no", "not possible"]),
        );
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("Abort", &["click missing thing".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Failed);
        assert_eq!(report.failed_step.as_deref(), Some("click missing thing"));
        assert_eq!(vision.locate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.statistics.actions.failed, 1);
    }

    #[tokio::test]
    async fn locate_attempts_never_exceed_the_bound() {
        let device = Arc::new(MockDevice::default());
        let vision =
            Arc::new(MockVision::default().queued_queries(vec!["yes", "yes", "yes"]));
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("Bound", &["click ghost button".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Failed);
        assert_eq!(vision.locate_calls.load(Ordering::SeqCst), 3);
        assert!(device.taps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn click_navigation_suggestion_locates_its_own_target() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(
            MockVision::with_locates(vec![
                None,
                Some(Point::new(0.9, 0.1)),
                Some(Point::new(0.5, 0.9)),
            ])
            .queued_queries(vec!["no", "click settings icon"]),
        );
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("NavClick", &["click advanced options".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Success);
        // One tap for the navigation click, one for the target element.
        assert_eq!(device.taps.lock().unwrap().len(), 2);
        assert_eq!(report.statistics.navigation.auto_navigations, 1);
    }

    #[tokio::test]
    async fn type_step_runs_without_coordinates() {
        let device = Arc::new(MockDevice::default());
        let vision = Arc::new(MockVision::default());
        let mut engine = test_engine(device.clone(), vision.clone());

        let report = engine
            .run_case("Type", &["type hello and press enter".to_string()])
            .await;

        assert_eq!(report.status, TestStatus::Success);
        assert_eq!(device.typed.lock().unwrap().as_slice(), &["hello".to_string()]);
        assert_eq!(vision.locate_calls.load(Ordering::SeqCst), 0);
    }
}
