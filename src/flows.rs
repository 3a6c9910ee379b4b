//! User-triggered flows
//!
//! - [`CommentPredictor`]: one comment in, topic and sentiment out
//! - [`VideoAnalyzer`]: one video URL in, the full results view out
//!
//! Both make at most one service call per invocation and scope their errors to
//! their own output region. Neither retries.

use crate::api::ClassificationService;
use crate::charts::{ChartBoard, ChartSurface};
use crate::config::Config;
use crate::credential::{resolve_api_key, CredentialStore};
use crate::model::{AnalyzeRequest, PredictRequest};
use crate::screen::{Output, Region, Screen, LOADING};
use crate::view::AnalysisView;
use tracing::{info, warn};

pub const ALERT_EMPTY_COMMENT: &str = "Please enter a comment";
pub const ALERT_EMPTY_URL: &str = "Please enter a YouTube URL";

/// How one invocation of a flow ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Stopped client-side before any request was sent
    Blocked,
    /// The request failed; carries the message shown to the user
    Failed(String),
    Done(T),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}

pub struct CommentPredictor<'a, C: ClassificationService + ?Sized> {
    service: &'a C,
}

impl<'a, C: ClassificationService + ?Sized> CommentPredictor<'a, C> {
    pub fn new(service: &'a C) -> Self {
        Self { service }
    }

    /// The untrimmed comment is what gets sent
    pub fn run<S: Screen + ?Sized>(&self, screen: &mut S, comment: &str) -> Outcome<()> {
        if comment.trim().is_empty() {
            screen.alert(ALERT_EMPTY_COMMENT);
            return Outcome::Blocked;
        }

        screen.set_text(Output::Topic, LOADING);
        screen.set_text(Output::Sentiment, "");
        screen.set_visible(Region::SingleResult, true);

        let request = PredictRequest { comment: comment.to_string() };
        match self.service.predict(&request) {
            Ok(prediction) => {
                info!("predicted topic={} sentiment={}", prediction.topic, prediction.sentiment);
                screen.set_text(Output::Topic, &prediction.topic);
                screen.set_text(Output::Sentiment, &prediction.sentiment);
                Outcome::Done(())
            }
            Err(e) => {
                warn!("prediction failed: {}", e);
                let message = e.display_message();
                screen.set_text(Output::Topic, &format!("Error: {}", message));
                screen.set_text(Output::Sentiment, "");
                Outcome::Failed(message)
            }
        }
    }
}

/// Video analysis flow. Owns the chart slots of the results view.
pub struct VideoAnalyzer<S: ChartSurface> {
    config: Config,
    charts: ChartBoard<S>,
}

impl<S: ChartSurface> VideoAnalyzer<S> {
    pub fn new(config: Config, surface: S) -> Self {
        Self { config, charts: ChartBoard::new(surface) }
    }

    pub fn charts(&self) -> &ChartBoard<S> {
        &self.charts
    }

    pub fn run<C, W>(
        &mut self,
        service: &C,
        store: &dyn CredentialStore,
        screen: &mut W,
        url: &str,
    ) -> Outcome<AnalysisView>
    where
        C: ClassificationService + ?Sized,
        W: Screen + ?Sized,
    {
        if url.trim().is_empty() {
            screen.alert(ALERT_EMPTY_URL);
            return Outcome::Blocked;
        }

        let api_key = match resolve_api_key(store, screen) {
            Some(k) => k,
            None => return Outcome::Blocked,
        };

        screen.set_visible(Region::AnalysisCard, true);
        screen.set_visible(Region::Loading, true);
        screen.set_visible(Region::Results, false);

        let request = AnalyzeRequest { url: url.to_string(), api_key };
        let response = match service.analyze(&request) {
            Ok(r) => r,
            Err(e) => {
                warn!("analysis failed: {}", e);
                let message = e.display_message();
                screen.set_visible(Region::Loading, false);
                screen.show_failure(&format!("Analysis failed: {}", message));
                screen.set_visible(Region::Results, true);
                return Outcome::Failed(message);
            }
        };

        screen.set_visible(Region::Loading, false);
        screen.set_visible(Region::Results, true);

        let view = AnalysisView::build(&response, &self.config);
        info!(
            "analysis done: {} rows, {} censorable",
            view.rows.len(),
            view.censorable_rows().count()
        );

        screen.set_text(Output::TopTopic, &view.top_topic);
        screen.set_text(Output::TopSentiment, &view.top_sentiment);
        screen.show_legends(&view.topic_legend, &view.sentiment_legend);
        self.charts.show(&view.bar_chart, &view.topic_pie, &view.sentiment_pie);
        screen.show_table(&view.rows);

        Outcome::Done(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, HttpService, GENERIC_FAILURE};
    use crate::charts::{ChartRegistry, SlotId};
    use crate::credential::{MemoryStore, API_KEY_SLOT, PROMPT_API_KEY};
    use crate::model::{AnalysisResponse, CensorableResults, DetailedResult, Prediction};
    use crate::screen::CapturedScreen;
    use std::cell::RefCell;

    /// Fake service that records requests and replays canned results
    #[derive(Default)]
    struct FakeService {
        predictions: RefCell<Vec<PredictRequest>>,
        analyses: RefCell<Vec<AnalyzeRequest>>,
        fail_with: Option<(u16, Option<String>)>,
    }

    impl FakeService {
        fn failing(status: u16, message: Option<&str>) -> Self {
            Self { fail_with: Some((status, message.map(String::from))), ..Default::default() }
        }

        fn error(&self) -> Option<ApiError> {
            self.fail_with
                .as_ref()
                .map(|(status, message)| ApiError::Server { status: *status, message: message.clone() })
        }
    }

    impl ClassificationService for FakeService {
        fn predict(&self, request: &PredictRequest) -> Result<Prediction, ApiError> {
            self.predictions.borrow_mut().push(request.clone());
            // /predict failures never carry a message
            if let Some((status, _)) = self.fail_with {
                return Err(ApiError::Server { status, message: None });
            }
            Ok(Prediction { topic: "politics".into(), sentiment: "neutral".into() })
        }

        fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResponse, ApiError> {
            self.analyses.borrow_mut().push(request.clone());
            if let Some(e) = self.error() {
                return Err(e);
            }
            Ok(sample_response())
        }
    }

    fn sample_response() -> AnalysisResponse {
        AnalysisResponse {
            topic_percentages: [("hate", 10.0), ("others", 50.0), ("joy", 40.0)].into_iter().collect(),
            sentiment_percentages: [("happy", 30.0), ("hate", 60.0), ("sad", 10.0)].into_iter().collect(),
            censorable_results: CensorableResults { count: 2, percentage: 66.7 },
            detailed_results: vec![
                DetailedResult::new("one", "Threat", "neutral"),
                DetailedResult::new("two", "politics", "Hate"),
                DetailedResult::new("three", "sports", "happy"),
            ],
            total_comments: None,
        }
    }

    /// Address nothing listens on, so connections are refused
    fn closed_port() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn keyed_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.save(API_KEY_SLOT, "key-1").unwrap();
        store
    }

    // ==========================================================================
    // SINGLE COMMENT TESTS
    // ==========================================================================

    #[test]
    fn test_predict_sends_one_request_and_writes_outputs() {
        let service = FakeService::default();
        let mut screen = CapturedScreen::new();

        let outcome = CommentPredictor::new(&service).run(&mut screen, "  ভালো খবর ");

        assert_eq!(outcome, Outcome::Done(()));
        let sent = service.predictions.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].comment, "  ভালো খবর ");
        assert_eq!(screen.text(Output::Topic), Some("politics"));
        assert_eq!(screen.text(Output::Sentiment), Some("neutral"));
        assert!(screen.is_visible(Region::SingleResult));
    }

    #[test]
    fn test_predict_shows_loading_first() {
        let service = FakeService::default();
        let mut screen = CapturedScreen::new();
        CommentPredictor::new(&service).run(&mut screen, "x");
        assert_eq!(screen.texts[0], (Output::Topic, LOADING.to_string()));
        assert_eq!(screen.texts[1], (Output::Sentiment, String::new()));
    }

    #[test]
    fn test_predict_blank_input_is_blocked() {
        let service = FakeService::default();
        for input in ["", "   ", "\n\t"] {
            let mut screen = CapturedScreen::new();
            let outcome = CommentPredictor::new(&service).run(&mut screen, input);
            assert_eq!(outcome, Outcome::Blocked);
            assert_eq!(screen.alerts, vec![ALERT_EMPTY_COMMENT]);
            assert!(screen.texts.is_empty());
        }
        assert!(service.predictions.borrow().is_empty());
    }

    #[test]
    fn test_predict_failure_shows_error_in_topic() {
        let service = FakeService::failing(500, None);
        let mut screen = CapturedScreen::new();

        let outcome = CommentPredictor::new(&service).run(&mut screen, "x");

        assert_eq!(outcome, Outcome::Failed(GENERIC_FAILURE.to_string()));
        assert_eq!(screen.text(Output::Topic), Some("Error: Server error"));
        assert_eq!(screen.text(Output::Sentiment), Some(""));
    }

    #[test]
    fn test_predict_unreachable_service_shows_error() {
        let service = HttpService::new(closed_port()).unwrap();
        let mut screen = CapturedScreen::new();

        let message = match CommentPredictor::new(&service).run(&mut screen, "x") {
            Outcome::Failed(m) => m,
            other => panic!("expected failure, got {:?}", other),
        };

        assert!(!message.is_empty());
        assert_eq!(screen.text(Output::Topic), Some(format!("Error: {}", message).as_str()));
        assert_eq!(screen.text(Output::Sentiment), Some(""));
    }

    // ==========================================================================
    // VIDEO ANALYSIS TESTS
    // ==========================================================================

    fn analyzer() -> VideoAnalyzer<ChartRegistry> {
        VideoAnalyzer::new(Config::default(), ChartRegistry::new())
    }

    #[test]
    fn test_analyze_blank_url_is_blocked() {
        let service = FakeService::default();
        let store = keyed_store();
        let mut screen = CapturedScreen::new();

        let outcome = analyzer().run(&service, &store, &mut screen, "  ");

        assert!(matches!(outcome, Outcome::Blocked));
        assert_eq!(screen.alerts, vec![ALERT_EMPTY_URL]);
        assert!(service.analyses.borrow().is_empty());
    }

    #[test]
    fn test_analyze_without_key_prompts_then_blocks() {
        let service = FakeService::default();
        let store = MemoryStore::new();
        let mut screen = CapturedScreen::new();

        let outcome = analyzer().run(&service, &store, &mut screen, "https://www.youtube.com/watch?v=abc");

        assert!(matches!(outcome, Outcome::Blocked));
        assert_eq!(screen.prompts, vec![PROMPT_API_KEY]);
        assert!(service.analyses.borrow().is_empty());
        assert!(!screen.is_visible(Region::AnalysisCard));
    }

    #[test]
    fn test_analyze_prompted_key_is_sent_and_cached() {
        let service = FakeService::default();
        let store = MemoryStore::new();
        let mut screen = CapturedScreen::new().with_prompt_answer(Some("typed".into()));

        let outcome = analyzer().run(&service, &store, &mut screen, "https://youtu.be/abc");

        assert!(outcome.is_done());
        let sent = service.analyses.borrow();
        assert_eq!(sent[0], AnalyzeRequest { url: "https://youtu.be/abc".into(), api_key: "typed".into() });
        assert_eq!(store.load(API_KEY_SLOT).unwrap(), Some("typed".to_string()));
    }

    #[test]
    fn test_analyze_success_renders_everything() {
        let service = FakeService::default();
        let store = keyed_store();
        let mut screen = CapturedScreen::new();
        let mut analyzer = analyzer();

        let outcome = analyzer.run(&service, &store, &mut screen, "https://youtu.be/abc");

        let view = match outcome {
            Outcome::Done(v) => v,
            other => panic!("expected success, got {:?}", other),
        };
        assert_eq!(screen.text(Output::TopTopic), Some("Joy and Others"));
        assert_eq!(screen.text(Output::TopSentiment), Some("hate"));
        assert!(screen.is_visible(Region::Results));
        assert!(!screen.is_visible(Region::Loading));
        assert!(screen.failure.is_none());
        assert_eq!(screen.topic_legend.len(), 3);
        assert_eq!(screen.rows.len(), 3);
        assert_eq!(view.counts.topic("threat"), 1);
        assert_eq!(view.counts.topic("abusive"), 0);
        assert_eq!(view.counts.sentiment("hate"), 1);
        let flagged: Vec<usize> = view.censorable_rows().map(|r| r.index).collect();
        assert_eq!(flagged, vec![1, 2]);
        assert_eq!(analyzer.charts().live_slots(), 3);
    }

    #[test]
    fn test_analyze_twice_keeps_one_chart_per_slot() {
        let service = FakeService::default();
        let store = keyed_store();
        let mut analyzer = analyzer();

        for _ in 0..2 {
            let mut screen = CapturedScreen::new();
            assert!(analyzer.run(&service, &store, &mut screen, "https://youtu.be/abc").is_done());
        }

        let reg = analyzer.charts().surface();
        assert_eq!(reg.live_in(SlotId::TopicPie), 1);
        assert_eq!(reg.live_in(SlotId::SentimentPie), 1);
        assert_eq!(reg.live_in(SlotId::Censorable), 1);
        assert_eq!(reg.created(), 6);
        assert_eq!(reg.destroyed(), 3);
    }

    #[test]
    fn test_analyze_failure_banner_uses_server_message() {
        let service = FakeService::failing(403, Some("quota exceeded"));
        let store = keyed_store();
        let mut screen = CapturedScreen::new();

        let outcome = analyzer().run(&service, &store, &mut screen, "https://youtu.be/abc");

        assert_eq!(outcome, Outcome::Failed("quota exceeded".to_string()));
        let banner = screen.failure.as_deref().unwrap();
        assert!(banner.contains("quota exceeded"));
        assert!(!screen.is_visible(Region::Loading));
        assert!(screen.is_visible(Region::Results));
    }

    #[test]
    fn test_analyze_failure_banner_generic_fallback() {
        let service = FakeService::failing(500, None);
        let store = keyed_store();
        let mut screen = CapturedScreen::new();

        analyzer().run(&service, &store, &mut screen, "https://youtu.be/abc");

        assert_eq!(screen.failure.as_deref(), Some("Analysis failed: Server error"));
    }

    #[test]
    fn test_analyze_unreachable_service_shows_banner() {
        let service = HttpService::new(closed_port()).unwrap();
        let store = keyed_store();
        let mut screen = CapturedScreen::new();

        let message = match analyzer().run(&service, &store, &mut screen, "https://youtu.be/abc") {
            Outcome::Failed(m) => m,
            other => panic!("expected failure, got {:?}", other),
        };

        assert!(!message.is_empty());
        assert_eq!(screen.failure, Some(format!("Analysis failed: {}", message)));
        assert!(!screen.is_visible(Region::Loading));
        assert!(screen.is_visible(Region::Results));
    }

    #[test]
    fn test_failure_leaves_previous_charts_alone() {
        let store = keyed_store();
        let mut analyzer = analyzer();
        let mut screen = CapturedScreen::new();
        analyzer.run(&FakeService::default(), &store, &mut screen, "u");

        let mut screen = CapturedScreen::new();
        analyzer.run(&FakeService::failing(500, None), &store, &mut screen, "u");

        assert_eq!(analyzer.charts().surface().live_count(), 3);
    }
}
