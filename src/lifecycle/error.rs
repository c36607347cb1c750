use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("consumer already started")]
    ConsumerAlreadyStarted,

    #[error("shutdown already initiated")]
    ShutdownInitiated,
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
