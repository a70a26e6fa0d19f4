use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use super::Advance;

/// Predicate polled by a wait-until step with the seconds spent waiting so far.
pub type UntilPredicate = Box<dyn FnMut(f32) -> bool + Send>;

enum Step {
    Run(Box<dyn FnOnce() + Send>),
    WaitFor(f32),
    WaitUntil(UntilPredicate),
}

struct Pending {
    step: Step,
    waited: f32,
}

/// Ordered list of actions and waits, consumed one step per advance.
///
/// ```ignore
/// tasks.wait_for(2.0).then(|| log::info!("two seconds later"));
/// ```
#[derive(Default)]
pub struct TaskQueue {
    steps: VecDeque<Pending>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(&mut self, action: impl FnOnce() + Send + 'static) -> &mut Self {
        self.push(Step::Run(Box::new(action)))
    }

    pub fn then_wait_for(&mut self, seconds: f32) -> &mut Self {
        self.push(Step::WaitFor(seconds))
    }

    pub fn then_wait_until(&mut self, predicate: impl FnMut(f32) -> bool + Send + 'static) -> &mut Self {
        self.push(Step::WaitUntil(Box::new(predicate)))
    }

    /// Drops every pending step.
    pub fn stop(&mut self) {
        self.steps.clear();
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.steps.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push_back(Pending { step, waited: 0.0 });
        self
    }
}

impl Advance for TaskQueue {
    fn advance(&mut self, dt: Duration) {
        let Some(front) = self.steps.front_mut() else {
            return;
        };
        front.waited += dt.as_secs_f32();

        let done = match &mut front.step {
            Step::Run(_) => true,
            Step::WaitFor(seconds) => front.waited >= *seconds,
            Step::WaitUntil(predicate) => predicate(front.waited),
        };
        if !done {
            return;
        }

        if let Some(Pending { step: Step::Run(action), .. }) = self.steps.pop_front() {
            action();
        }
    }
}

#[derive(Default)]
struct ManagerState {
    running: Vec<TaskQueue>,
    spare: Vec<TaskQueue>,
    /// Bumped by `stop_all`, so queues checked out by an advance in flight
    /// are cancelled too.
    generation: u64,
}

/// Owns running task queues and recycles finished ones.
///
/// A cheap-to-clone handle: clones share the same queues. The internal lock
/// is released while task actions run, so an action may start new queues on
/// the manager that is stepping it. Queues started during an advance first
/// advance on the next step.
#[derive(Clone, Default)]
pub struct TaskManager {
    state: Arc<Mutex<ManagerState>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a queue that first waits `seconds`.
    ///
    /// The returned guard holds the manager's lock; chain on it and let it drop.
    pub fn wait_for(&self, seconds: f32) -> MappedMutexGuard<'_, TaskQueue> {
        let mut queue = self.start();
        queue.then_wait_for(seconds);
        queue
    }

    /// Starts a queue that first waits until `predicate` holds.
    pub fn wait_until(
        &self,
        predicate: impl FnMut(f32) -> bool + Send + 'static,
    ) -> MappedMutexGuard<'_, TaskQueue> {
        let mut queue = self.start();
        queue.then_wait_until(predicate);
        queue
    }

    pub fn stop_all(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        let ManagerState { running, spare, .. } = &mut *state;
        for mut queue in running.drain(..) {
            queue.stop();
            spare.push(queue);
        }
    }

    #[inline]
    pub fn running(&self) -> usize {
        self.state.lock().running.len()
    }

    fn start(&self) -> MappedMutexGuard<'_, TaskQueue> {
        MutexGuard::map(self.state.lock(), |state| {
            let queue = state.spare.pop().unwrap_or_default();
            state.running.push(queue);
            let last = state.running.len() - 1;
            &mut state.running[last]
        })
    }
}

impl Advance for TaskManager {
    fn advance(&mut self, dt: Duration) {
        let (mut stepping, generation) = {
            let mut state = self.state.lock();
            (std::mem::take(&mut state.running), state.generation)
        };

        for queue in &mut stepping {
            queue.advance(dt);
        }

        let mut state = self.state.lock();
        if state.generation != generation {
            stepping.iter_mut().for_each(TaskQueue::stop);
        }
        let started = std::mem::replace(&mut state.running, Vec::with_capacity(stepping.len()));
        for queue in stepping.into_iter().chain(started) {
            if queue.is_complete() {
                state.spare.push(queue);
            } else {
                state.running.push(queue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce() + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(name)) as Box<dyn FnOnce() + Send>
        };
        (log, make)
    }

    // ── TaskQueue ────────────────────────────────────────────────────────

    #[test]
    fn one_step_per_advance() {
        let (log, make) = recorder();
        let mut queue = TaskQueue::new();
        queue.then(make("a")).then(make("b"));

        queue.advance(STEP);
        assert_eq!(*log.lock(), ["a"]);
        queue.advance(STEP);
        assert_eq!(*log.lock(), ["a", "b"]);
        assert!(queue.is_complete());
    }

    #[test]
    fn wait_for_blocks_until_elapsed() {
        let (log, make) = recorder();
        let mut queue = TaskQueue::new();
        queue.then_wait_for(0.25).then(make("done"));

        queue.advance(STEP);
        queue.advance(STEP);
        assert_eq!(queue.len(), 2);
        queue.advance(STEP);
        assert_eq!(queue.len(), 1);
        queue.advance(STEP);
        assert_eq!(*log.lock(), ["done"]);
    }

    #[test]
    fn wait_until_polls_predicate() {
        let flag = Arc::new(AtomicU32::new(0));
        let seen = flag.clone();
        let mut queue = TaskQueue::new();
        queue.then_wait_until(move |_| seen.load(Ordering::SeqCst) > 0);

        queue.advance(STEP);
        assert!(!queue.is_complete());
        flag.store(1, Ordering::SeqCst);
        queue.advance(STEP);
        assert!(queue.is_complete());
    }

    #[test]
    fn stop_drops_pending_steps() {
        let (log, make) = recorder();
        let mut queue = TaskQueue::new();
        queue.then_wait_for(1.0).then(make("never"));
        queue.stop();
        queue.advance(Duration::from_secs(2));
        queue.advance(Duration::from_secs(2));
        assert!(log.lock().is_empty());
    }

    // ── TaskManager ──────────────────────────────────────────────────────

    #[test]
    fn manager_runs_queues_and_recycles_finished() {
        let (log, make) = recorder();
        let mut tasks = TaskManager::new();
        tasks.wait_for(0.1).then(make("fast"));
        tasks.wait_for(0.3).then(make("slow"));
        assert_eq!(tasks.running(), 2);

        for _ in 0..2 {
            tasks.advance(STEP);
        }
        assert_eq!(*log.lock(), ["fast"]);
        assert_eq!(tasks.running(), 1);

        for _ in 0..3 {
            tasks.advance(STEP);
        }
        assert_eq!(*log.lock(), ["fast", "slow"]);
        assert_eq!(tasks.running(), 0);

        tasks.wait_until(|waited| waited > 0.0);
        assert_eq!(tasks.running(), 1);
        assert_eq!(tasks.state.lock().spare.len(), 1);
    }

    #[test]
    fn actions_can_start_queues_on_their_own_manager() {
        let (log, make) = recorder();
        let mut tasks = TaskManager::new();
        let handle = tasks.clone();
        let follow_up = make("follow-up");
        tasks.wait_for(0.0).then(move || {
            handle.wait_for(0.1).then(follow_up);
        });

        tasks.advance(STEP);
        assert!(log.lock().is_empty());
        tasks.advance(STEP);
        assert_eq!(tasks.running(), 1);

        for _ in 0..2 {
            tasks.advance(STEP);
        }
        assert_eq!(*log.lock(), ["follow-up"]);
        assert_eq!(tasks.running(), 0);
    }

    #[test]
    fn stop_all_from_an_action_cancels_queues_in_flight() {
        let (log, make) = recorder();
        let mut tasks = TaskManager::new();
        let handle = tasks.clone();
        tasks.wait_for(0.0).then(move || handle.stop_all());
        tasks.wait_for(0.0).then_wait_for(0.0).then(make("never"));

        for _ in 0..4 {
            tasks.advance(STEP);
        }
        assert!(log.lock().is_empty());
        assert_eq!(tasks.running(), 0);
    }

    #[test]
    fn stop_all_cancels_everything() {
        let (log, make) = recorder();
        let mut tasks = TaskManager::new();
        tasks.wait_for(0.1).then(make("a"));
        tasks.wait_for(0.1).then(make("b"));

        tasks.stop_all();
        tasks.advance(Duration::from_secs(1));
        assert_eq!(tasks.running(), 0);
        assert!(log.lock().is_empty());
    }
}
