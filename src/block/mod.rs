
use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/* A type implementing StreamFunctionality consumes contiguous windows of a
sample stream and produces exactly one output per window, together with the
number of samples it actually used.  The runtime owns the sample buffer and
guarantees each window holds at least forecast() samples; draining only what
the block consumed is the back-pressure contract between the two. */
pub trait StreamFunctionality<C, D, T: Clone, U> {

	fn control(&mut self, control:&C) -> Result<D, &'static str>;
	fn forecast(&self) -> usize;
	fn apply_window(&mut self, window:&[T]) -> (U, usize);

}

pub struct StreamBlock<C: 'static + Send, T: 'static + Send, U: 'static + Send> {
	pub tx_control: mpsc::Sender<C>,
	pub tx_input:   mpsc::Sender<Vec<T>>,
	pub rx_output:  mpsc::Receiver<U>,
	pub handle:     JoinHandle<Result<(), &'static str>>,
}

impl<C: 'static + Send + Sync, T: 'static + Send + Sync + Clone, U: 'static + Send + Sync> StreamBlock<C, T, U> {

	pub fn from<B: 'static + StreamFunctionality<C, (), T, U> + Send + Sync>(b:B) -> Self {

		let (tx_control, mut rx_control) = mpsc::channel::<C>(10);
		let (tx_input, mut rx_input) = mpsc::channel::<Vec<T>>(10);
		let (tx_output, rx_output) = mpsc::channel::<U>(10);

		let handle:JoinHandle<Result<(), &'static str>> = tokio::spawn(async move {

			let mut owned_b = b;
			let mut buffer:VecDeque<T> = VecDeque::new();

			while let Some(chunk) = rx_input.recv().await {

				// Interleaving control handling with input handling avoids a
				// mutex around the block state
				while let Ok(c) = rx_control.try_recv() {
					owned_b.control(&c)?;
				}

				buffer.extend(chunk);

				while buffer.len() >= owned_b.forecast() {
					let (u, consumed) = {
						let window = buffer.make_contiguous();
						owned_b.apply_window(window)
					};
					tx_output.send(u).await.map_err(|_| "Unable to send output")?;
					if consumed == 0 {
						// An idle block holds its position; wait for more input
						break;
					}
					buffer.drain(..consumed);
				}

			}

			Ok(())
		});

		StreamBlock{ tx_control, tx_input, rx_output, handle }
	}

	pub async fn shutdown(self) -> Result<(), &'static str> {
		drop(self.tx_control);
		drop(self.tx_input);
		self.handle.await.map_err(|_| "Stream task panicked")?
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	/* Sums pairs of samples, consuming two per window, with a controllable
	gain.  Small enough to check the windowing arithmetic by hand. */
	struct PairSummer {
		gain: i64,
	}

	impl StreamFunctionality<i64, (), i64, i64> for PairSummer {

		fn control(&mut self, control:&i64) -> Result<(), &'static str> {
			self.gain = *control;
			Ok(())
		}

		fn forecast(&self) -> usize { 4 }

		fn apply_window(&mut self, window:&[i64]) -> (i64, usize) {
			(self.gain * (window[0] + window[1]), 2)
		}

	}

	#[tokio::test]
	async fn windows_are_applied_in_stream_order() {

		let mut blk = StreamBlock::from(PairSummer{ gain: 1 });

		blk.tx_input.send(vec![1, 2, 3]).await.unwrap();		// below forecast, nothing emitted
		blk.tx_input.send(vec![4, 5, 6, 7, 8]).await.unwrap();

		let mut outputs:Vec<i64> = vec![];
		for _ in 0..3 {
			outputs.push(blk.rx_output.recv().await.unwrap());
		}
		assert_eq!(outputs, vec![3, 7, 11]);	// (1+2), (3+4), (5+6); 7 and 8 stay buffered

		// Control messages take effect before the next window
		blk.tx_control.send(10).await.unwrap();
		blk.tx_input.send(vec![9, 10]).await.unwrap();
		assert_eq!(blk.rx_output.recv().await.unwrap(), 150);	// 10 * (7+8)

		blk.shutdown().await.unwrap();

	}

}
