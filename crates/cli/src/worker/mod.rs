// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Worker side of the dispatcher protocol, and the launchers that start workers.
//!
//! A worker reads [`Directive`]s from its input and writes [`WorkerEvent`]s to
//! its output. The first directive carries the [`FactoryRecipe`]; the worker
//! builds its processor from local services, acknowledges with `Ready`, and
//! then runs batches until `Stop` or end of input.

mod in_process;
mod launcher;
mod pipe;

use std::io::{BufReader, BufWriter, Read, Write};

use crate::processor::{EventSink, ProcessorFactory, ServiceRegistry, WorkerError};
use crate::protocol::{BatchId, Directive, ProtocolError, WorkerEvent, read_frame, write_frame};

pub use in_process::InProcessLauncher;
pub use launcher::{
    LaunchError, MessageBody, ProcessLauncher, WorkerConnection, WorkerControl, WorkerId,
    WorkerLauncher, WorkerMessage, spawn_event_reader,
};
pub use pipe::{PipeReader, PipeWriter, pipe};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Run the worker protocol until stopped.
///
/// Returns an error when initialization fails or a batch cannot be
/// processed; in both cases a `WorkerError` event has already been sent.
pub fn serve<R, W>(input: R, output: W, services: ServiceRegistry) -> Result<(), WorkerError>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let mut input = BufReader::new(input);
    let recipe = match read_frame::<_, Directive>(&mut input)? {
        Some(Directive::Init(recipe)) => recipe,
        Some(Directive::BatchStart { .. }) => {
            let err = WorkerError::NotInitialized("BatchStart");
            let event = WorkerEvent::WorkerError { message: err.to_string() };
            if let Err(e) = write_frame(&mut BufWriter::new(output), &event) {
                tracing::debug!("could not report {}: {}", err, e);
            }
            return Err(err);
        }
        Some(Directive::Stop) | None => {
            tracing::debug!("worker stopped before Init");
            return Ok(());
        }
    };

    let (tx, rx) = crossbeam_channel::unbounded::<WorkerEvent>();
    let writer = std::thread::spawn(move || -> Result<(), ProtocolError> {
        let mut output = BufWriter::new(output);
        for event in rx {
            write_frame(&mut output, &event)?;
        }
        Ok(())
    });
    let sink = EventSink::new(tx);

    let result = run_processor(&recipe, input, &sink, services);
    if let Err(e) = &result {
        sink.emit(WorkerEvent::WorkerError {
            message: e.to_string(),
        });
    }
    drop(sink);

    match writer.join() {
        Ok(Err(e)) => tracing::debug!("event stream closed early: {}", e),
        Err(_) => tracing::warn!("event writer panicked"),
        Ok(Ok(())) => {}
    }
    result
}

fn run_processor<R: Read + Send + 'static>(
    recipe: &impl ProcessorFactory,
    mut input: R,
    sink: &EventSink,
    services: ServiceRegistry,
) -> Result<(), WorkerError> {
    let mut processor = recipe.create(&services)?;
    processor.start_processing(sink.clone());
    sink.emit(WorkerEvent::Ready);

    // Directives are read on their own thread so `Stop` reaches a running batch.
    let stop = services.stop_signal();
    let (batch_tx, batch_rx) = crossbeam_channel::unbounded::<(BatchId, Vec<String>)>();
    std::thread::spawn(move || {
        loop {
            match read_frame::<_, Directive>(&mut input) {
                Ok(Some(Directive::BatchStart { batch_id, classes })) => {
                    if batch_tx.send((batch_id, classes)).is_err() {
                        break;
                    }
                }
                Ok(Some(Directive::Init(_))) => {
                    tracing::warn!("ignoring repeated Init directive");
                }
                Ok(Some(Directive::Stop)) | Ok(None) => break,
                Err(e) => {
                    tracing::warn!("unreadable directive: {}", e);
                    break;
                }
            }
        }
        stop.request();
    });

    let stop = services.stop_signal();
    let mut result = Ok(());
    for (batch_id, classes) in batch_rx {
        if stop.is_requested() {
            break;
        }
        tracing::debug!(batch = batch_id, classes = classes.len(), "starting batch");
        if let Err(e) = processor.process_batch(batch_id, &classes) {
            result = Err(e);
            break;
        }
    }
    processor.stop();
    result
}
