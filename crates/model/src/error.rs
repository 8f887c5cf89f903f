/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The credential was missing or rejected by the provider.
    Auth,
    /// The provider could not be reached.
    Network,
    /// The provider replied, but the structured result was missing
    /// fields or could not be parsed.
    MalformedOutput,
    /// Any other errors.
    Other,
}
