use futures::stream::{self, StreamExt};
use std::future::Future;

pub async fn execute_concurrently<T, F>(tasks: Vec<F>, limit: usize) -> Vec<Option<T>>
where
    F: Future<Output = Result<T, String>>,
{
    if tasks.is_empty() {
        return Vec::new();
    }

    let concurrency = limit.max(1);
    let task_count = tasks.len();
    let mut results: Vec<Option<T>> = Vec::with_capacity(task_count);
    results.resize_with(task_count, || None);

    let indexed_tasks = tasks
        .into_iter()
        .enumerate()
        .map(|(task_index, task)| async move { (task_index, task.await) });
    let mut completions = stream::iter(indexed_tasks).buffer_unordered(concurrency);

    while let Some((task_index, task_result)) = completions.next().await {
        match task_result {
            Ok(value) => results[task_index] = Some(value),
            Err(error) => {
                tracing::warn!(task_index, "Concurrent task failed: {error}");
            }
        }
    }

    results
}
