// Kairos Infrastructure - HTTP Adapter
// Implements: CallbackSender (reqwest)

mod callback_sender;

pub use callback_sender::HttpCallbackSender;
