use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};

/// Execution providers to register on a detector session, in priority order.
///
/// The platform accelerator comes first; ONNX Runtime silently skips it when
/// unavailable and CPU always closes the list.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::with_capacity(2);
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers.push(CPUExecutionProvider::default().build());
    providers
}
