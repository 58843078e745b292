use core::hash::Hash;
use std::collections::HashMap;
use crossbeam_channel::Sender;




/// Returned by [`Automaton::receive`]: whether the task now has every
/// message it was waiting for.
pub enum Status {
    Eligible,
    Ineligible,
}

impl Status {
    pub fn eligible_if(condition: bool) -> Self {
        if condition {
            Self::Eligible
        } else {
            Self::Ineligible
        }
    }
}




/**
 * A task in a group which exchanges messages with its peers before it
 * computes a value. Here the tasks are the grids of a domain during one
 * Runge-Kutta stage: each grid sends its edge cells to the grids whose
 * guard zones they fill, and is advanced once its own guard zones have all
 * arrived. Messages are moved to the recipient, so no buffer is shared
 * between threads.
 */
pub trait Automaton {
    /// Identifies the task within its group; must be unique.
    type Key;

    /// The content of a message. A task may expect any number of them.
    type Message;

    /// The product of the task. Computing it is the expensive part, and may
    /// happen on a worker thread.
    type Value;

    fn key(&self) -> Self::Key;

    /// The messages this task sends, addressed by key. Called once, before
    /// the task receives anything.
    fn messages(&self) -> Vec<(Self::Key, Self::Message)>;

    /// Whether the task expects no messages at all, and can run as soon as
    /// it is seen.
    fn independent(&self) -> bool {
        false
    }

    /// Take ownership of one incoming message, and report whether the task
    /// is now ready to run.
    fn receive(&mut self, message: Self::Message) -> Status;

    /// Run the task.
    fn value(self) -> Self::Value;
}




/// Run a group of tasks on the calling thread. Tasks which never become
/// eligible are dropped, so the caller should check the number of values.
pub fn execute<I, A, K, V>(stage: I) -> impl Iterator<Item = V>
where
    I: IntoIterator<Item = A>,
    A: Automaton<Key = K, Value = V>,
    K: Hash + Eq,
{
    let (eligible_sink, eligible_source) = crossbeam_channel::unbounded();

    coordinate(stage, eligible_sink);

    eligible_source.into_iter().map(|task: A| task.value())
}




/**
 * Run a group of tasks on the rayon pool. The calling thread delivers
 * messages; a task spawned into `scope` moves each eligible task onto the
 * pool and sends its value to the returned iterator. The pool must have at
 * least two threads, or the delivery and the dispatch would queue behind
 * one another.
 */
pub fn execute_par<'a, I, A, K, V>(scope: &rayon::Scope<'a>, stage: I) -> impl Iterator<Item = V>
where
    I: IntoIterator<Item = A>,
    A: Send + Automaton<Key = K, Value = V> + 'a,
    K: Hash + Eq,
    V: Send + 'a,
{
    use rayon::prelude::*;

    assert!(rayon::current_num_threads() >= 2, "execute_par needs a pool of at least two threads");

    let (eligible_sink, eligible_source) = crossbeam_channel::unbounded();
    let (computed_sink, computed_source) = crossbeam_channel::unbounded();

    scope.spawn(move |_| {
        eligible_source
            .into_iter()
            .par_bridge()
            .for_each(|task: A| computed_sink.send(task.value()).unwrap())
    });

    coordinate(stage, eligible_sink);
    computed_source.into_iter()
}




/**
 * Deliver the messages of every task in the stage, forwarding each task to
 * `eligible` once it has received all of its messages. Mail for a task not
 * yet seen waits in its mailbox.
 */
fn coordinate<I, A, K, M, V>(stage: I, eligible: Sender<A>)
where
    I: IntoIterator<Item = A>,
    A: Automaton<Key = K, Message = M, Value = V>,
    K: Hash + Eq,
{
    let mut waiting: HashMap<K, A> = HashMap::new();
    let mut mailboxes: HashMap<K, Vec<M>> = HashMap::new();

    for mut task in stage {
        for (dest, message) in task.messages() {
            match waiting.get_mut(&dest) {
                Some(peer) => {
                    if let Status::Eligible = peer.receive(message) {
                        if let Some(peer) = waiting.remove(&dest) {
                            eligible.send(peer).unwrap()
                        }
                    }
                }
                None => mailboxes.entry(dest).or_insert_with(Vec::new).push(message),
            }
        }

        let key = task.key();
        let mut ready = task.independent();

        if let Some(mail) = mailboxes.remove(&key) {
            for message in mail {
                if let Status::Eligible = task.receive(message) {
                    ready = true
                }
            }
        }

        if ready {
            eligible.send(task).unwrap()
        } else {
            waiting.insert(key, task);
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{execute, execute_par, Automaton, Status};

    /// Sums its own number with those of its two neighbors on a ring.
    struct RingCell {
        index: usize,
        size: usize,
        number: u64,
        received: Vec<u64>,
    }

    impl Automaton for RingCell {
        type Key = usize;
        type Message = u64;
        type Value = (usize, u64);

        fn key(&self) -> usize {
            self.index
        }

        fn messages(&self) -> Vec<(usize, u64)> {
            let l = (self.index + self.size - 1) % self.size;
            let r = (self.index + 1) % self.size;
            vec![(l, self.number), (r, self.number)]
        }

        fn receive(&mut self, message: u64) -> Status {
            self.received.push(message);
            Status::eligible_if(self.received.len() == 2)
        }

        fn value(self) -> (usize, u64) {
            (self.index, self.number + self.received.iter().sum::<u64>())
        }
    }

    fn ring(size: usize) -> Vec<RingCell> {
        (0..size).map(|index| RingCell { index, size, number: index as u64 * index as u64, received: Vec::new() }).collect()
    }

    fn expected(size: usize) -> Vec<(usize, u64)> {
        let n = |i: usize| (i * i) as u64;
        (0..size).map(|i| (i, n(i) + n((i + size - 1) % size) + n((i + 1) % size))).collect()
    }

    #[test]
    fn serial_execution_delivers_every_message() {
        let mut values: Vec<_> = execute(ring(16)).collect();
        values.sort();
        assert_eq!(values, expected(16));
    }

    #[test]
    fn parallel_execution_matches_serial() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let mut values: Vec<_> = pool.install(|| rayon::scope(|scope| execute_par(scope, ring(64)).collect::<Vec<_>>()));
        values.sort();
        assert_eq!(values, expected(64));
    }

    #[test]
    fn task_missing_a_peer_is_never_run() {
        let mut cells = ring(8);
        cells.remove(3);
        let values: Vec<_> = execute(cells).collect();
        assert_eq!(values.len(), 5);
    }
}
