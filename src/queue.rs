// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded blocking FIFO used for all hand-offs between threads.
//!
//! Two instances exist at runtime: one carrying accepted connections from the
//! acceptor to the workers, and one carrying journal records from the workers
//! to the journal writer. Both sides block rather than fail: `push` waits
//! while the queue is full and `pop` waits while it is empty, so a slow
//! consumer applies backpressure to its producers instead of dropping work.

use std::sync::{Condvar, Mutex};

/// Fixed-capacity ring buffer shared between producers and consumers.
///
/// Invariant: `len` slots starting at `head` (wrapping) hold `Some`, all
/// other slots hold `None`.
#[derive(Debug)]
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    len: usize,
}

/// A bounded multi-producer multi-consumer queue with blocking `push` and
/// `pop`.
///
/// Order is FIFO per producer; across producers, items come out in the order
/// their pushes completed. Waits loop on the predicate, so spurious wakeups
/// are tolerated.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    inner: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be nonzero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            inner: Mutex::new(Ring {
                slots: slots.into_boxed_slice(),
                head: 0,
                tail: 0,
                len: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Places `item` at the tail, blocking while the queue is full.
    pub fn push(&self, item: T) {
        let mut ring = self.inner.lock().unwrap();
        while ring.len == ring.slots.len() {
            ring = self.not_full.wait(ring).unwrap();
        }

        let tail = ring.tail;
        ring.slots[tail] = Some(item);
        ring.tail = (tail + 1) % ring.slots.len();
        ring.len += 1;

        drop(ring);
        self.not_empty.notify_one();
    }

    /// Removes and returns the head item, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let mut ring = self.inner.lock().unwrap();
        while ring.len == 0 {
            ring = self.not_empty.wait(ring).unwrap();
        }

        let head = ring.head;
        let item = ring.slots[head].take().expect("head slot is occupied");
        ring.head = (head + 1) % ring.slots.len();
        ring.len -= 1;

        drop(ring);
        self.not_full.notify_one();
        item
    }

    /// Number of items currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len
    }

    /// Whether the queue currently holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items the queue can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }
}

#[cfg(test)]
mod test {
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::BoundedQueue;

    #[test]
    fn fifo_order_is_preserved_with_single_producer() {
        let queue = Arc::new(BoundedQueue::new(8));

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for c in b'a'..=b'z' {
                    queue.push(c);
                }
            })
        };

        let mut consumed = String::new();
        for _ in 0..26 {
            consumed.push(queue.pop() as char);
        }

        assert_eq!("abcdefghijklmnopqrstuvwxyz", consumed);
        producer.join().unwrap();
    }

    #[test]
    fn pop_blocks_until_a_push_occurs() {
        let queue = Arc::new(BoundedQueue::<u32>::new(4));
        let (tx, rx) = mpsc::channel();

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || tx.send(queue.pop()).unwrap())
        };

        // the consumer must still be parked on the empty queue
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        queue.push(7);
        assert_eq!(Ok(7), rx.recv_timeout(Duration::from_secs(5)));
        consumer.join().unwrap();
    }

    #[test]
    fn push_blocks_while_the_queue_is_full() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(1);

        let (tx, rx) = mpsc::channel();
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                queue.push(2);
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        assert_eq!(1, queue.pop());
        assert_eq!(Ok(()), rx.recv_timeout(Duration::from_secs(5)));
        assert_eq!(2, queue.pop());
        producer.join().unwrap();
    }

    #[test]
    fn no_items_are_lost_or_duplicated_across_producers() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 100;

        let queue = Arc::new(BoundedQueue::new(8));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.push(p * PER_PRODUCER + i);
                    }
                })
            })
            .collect();

        let mut popped: Vec<usize> = (0..PRODUCERS * PER_PRODUCER)
            .map(|_| queue.pop())
            .collect();
        popped.sort_unstable();

        let expected: Vec<usize> = (0..PRODUCERS * PER_PRODUCER).collect();
        assert_eq!(expected, popped);

        for producer in producers {
            producer.join().unwrap();
        }
    }

    #[test]
    fn len_and_capacity_track_queue_state() {
        let queue = BoundedQueue::new(3);
        assert_eq!(3, queue.capacity());
        assert!(queue.is_empty());

        queue.push('x');
        queue.push('y');
        assert_eq!(2, queue.len());

        assert_eq!('x', queue.pop());
        assert_eq!(1, queue.len());
    }
}
