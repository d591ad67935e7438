#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wavyte_timeline::{
    ManualTime, MediaElement, MediaEvent, MediaKind, MediaResource, MediaRuntime, ResourceKind,
    TimeSource, WavyteError, WavyteResult,
};

/// Latencies and failures of the simulated media stack.
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub metadata_delay: Duration,
    pub seek_delay: Duration,
    pub load_delay: Duration,
    pub native_duration_sec: f64,
    pub frame_durations_ms: Vec<u32>,
    pub failing_srcs: BTreeSet<String>,
    pub stalled_srcs: BTreeSet<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            metadata_delay: Duration::from_millis(20),
            seek_delay: Duration::from_millis(8),
            load_delay: Duration::from_millis(15),
            native_duration_sec: 60.0,
            frame_durations_ms: vec![100, 100, 100],
            failing_srcs: BTreeSet::new(),
            stalled_srcs: BTreeSet::new(),
        }
    }
}

#[derive(Debug)]
enum Kind {
    Element(MediaKind),
    Resource(ResourceKind),
    Animated,
}

#[derive(Debug)]
pub struct SimNode {
    kind: Kind,
    pub src: String,
    created_at: Duration,
    ready_sent: bool,
    pub current_time: f64,
    pub paused: bool,
    pub rate: f64,
    pub volume: f64,
    pub muted: bool,
    seek_at: Option<Duration>,
    play_requested: bool,
    pub seeks: Vec<f64>,
    pub plays: usize,
    events: VecDeque<MediaEvent>,
}

type Node = Arc<Mutex<SimNode>>;

#[derive(Debug, Default)]
struct SimState {
    nodes: Vec<Node>,
    last_pump: Duration,
}

/// Deterministic media runtime driven by a [`ManualTime`]; `pump` advances time by the wait it
/// is given and delivers whatever became due. Clones share state.
#[derive(Clone, Debug)]
pub struct SimRuntime {
    time: ManualTime,
    config: Arc<SimConfig>,
    state: Arc<Mutex<SimState>>,
}

impl SimRuntime {
    pub fn new(time: ManualTime, config: SimConfig) -> Self {
        Self {
            time,
            config: Arc::new(config),
            state: Arc::default(),
        }
    }

    pub fn time(&self) -> ManualTime {
        self.time.clone()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().unwrap().nodes.len()
    }

    pub fn with_node<T>(&self, src: &str, f: impl FnOnce(&SimNode) -> T) -> Option<T> {
        let st = self.state.lock().unwrap();
        let node = st.nodes.iter().rev().find(|n| n.lock().unwrap().src == src)?;
        let guard = node.lock().unwrap();
        Some(f(&guard))
    }

    pub fn seeks(&self, src: &str) -> Vec<f64> {
        self.with_node(src, |n| n.seeks.clone()).unwrap_or_default()
    }

    fn add(&self, kind: Kind, src: &str) -> WavyteResult<Node> {
        let node = Arc::new(Mutex::new(SimNode {
            kind,
            src: src.to_owned(),
            created_at: self.time.now(),
            ready_sent: false,
            current_time: 0.0,
            paused: true,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            seek_at: None,
            play_requested: false,
            seeks: Vec::new(),
            plays: 0,
            events: VecDeque::new(),
        }));
        self.state.lock().unwrap().nodes.push(Arc::clone(&node));
        Ok(node)
    }

    fn deliver(&self, node: &mut SimNode, now: Duration, elapsed: Duration) {
        if !node.paused {
            node.current_time += elapsed.as_secs_f64() * node.rate;
        }
        if self.config.stalled_srcs.contains(&node.src) {
            return;
        }
        let ready_delay = match node.kind {
            Kind::Element(_) => self.config.metadata_delay,
            Kind::Resource(_) | Kind::Animated => self.config.load_delay,
        };
        if !node.ready_sent && now >= node.created_at + ready_delay {
            node.ready_sent = true;
            if self.config.failing_srcs.contains(&node.src) {
                node.events
                    .push_back(MediaEvent::Error(format!("cannot decode {}", node.src)));
                return;
            }
            node.events.push_back(match node.kind {
                Kind::Element(_) => MediaEvent::LoadedMetadata {
                    duration_sec: Some(self.config.native_duration_sec),
                },
                Kind::Resource(_) => MediaEvent::Loaded,
                Kind::Animated => MediaEvent::Decoded {
                    frame_durations_ms: self.config.frame_durations_ms.clone(),
                },
            });
        }
        if let Some(at) = node.seek_at
            && now >= at + self.config.seek_delay
        {
            node.seek_at = None;
            node.events.push_back(MediaEvent::Seeked);
            if matches!(node.kind, Kind::Element(MediaKind::Video)) {
                node.events.push_back(MediaEvent::FramePresented);
            }
        }
        if node.play_requested {
            node.play_requested = false;
            node.paused = false;
            node.events.push_back(MediaEvent::PlayResolved);
        }
    }
}

impl MediaRuntime for SimRuntime {
    fn create_element(
        &mut self,
        kind: MediaKind,
        src: &str,
    ) -> WavyteResult<Box<dyn MediaElement>> {
        if src.starts_with("missing:") {
            return Err(WavyteError::validation(format!("no such source {src}")));
        }
        let node = self.add(Kind::Element(kind), src)?;
        Ok(Box::new(SimHandle {
            node,
            time: self.time.clone(),
        }))
    }

    fn create_resource(
        &mut self,
        kind: ResourceKind,
        src: &str,
    ) -> WavyteResult<Box<dyn MediaResource>> {
        let node = self.add(Kind::Resource(kind), src)?;
        Ok(Box::new(SimHandle {
            node,
            time: self.time.clone(),
        }))
    }

    fn create_animated_image(&mut self, src: &str) -> WavyteResult<Box<dyn MediaResource>> {
        let node = self.add(Kind::Animated, src)?;
        Ok(Box::new(SimHandle {
            node,
            time: self.time.clone(),
        }))
    }

    fn pump(&mut self, max_wait: Duration) {
        self.time.advance(max_wait);
        let now = self.time.now();
        let mut st = self.state.lock().unwrap();
        let elapsed = now.saturating_sub(st.last_pump);
        st.last_pump = now;
        for node in &st.nodes {
            let mut node = node.lock().unwrap();
            self.deliver(&mut node, now, elapsed);
        }
    }
}

struct SimHandle {
    node: Node,
    time: ManualTime,
}

impl MediaResource for SimHandle {
    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.node.lock().unwrap().events.pop_front()
    }
}

impl MediaElement for SimHandle {
    fn current_time(&self) -> f64 {
        self.node.lock().unwrap().current_time
    }

    fn seek(&mut self, time_sec: f64) {
        let now = self.time.now();
        let mut node = self.node.lock().unwrap();
        node.current_time = time_sec;
        node.seeks.push(time_sec);
        node.seek_at = Some(now);
    }

    fn play(&mut self) {
        let mut node = self.node.lock().unwrap();
        node.play_requested = true;
        node.plays += 1;
    }

    fn pause(&mut self) {
        self.node.lock().unwrap().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.node.lock().unwrap().paused
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.node.lock().unwrap().rate = rate;
    }

    fn set_volume(&mut self, volume: f64) {
        self.node.lock().unwrap().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.node.lock().unwrap().muted = muted;
    }
}

/// Shared map of seek counts by source, for assertions across sessions.
pub fn seek_counts(rt: &SimRuntime, srcs: &[&str]) -> HashMap<String, usize> {
    srcs.iter()
        .map(|s| ((*s).to_owned(), rt.seeks(s).len()))
        .collect()
}
