//! Prompt assembly: fixed persona, retrieved context, history, question.
//!
//! Pure functions only; the pipeline owns all side effects.

use manualbot_types::{Conversation, Message, RetrievedChunk};

/// Default persona and grounding policy.
///
/// The policy is a domain requirement, not styling: the model must answer
/// only from the supplied reference documents and must say so explicitly
/// when they do not contain the answer, instead of guessing.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "\
You are a smart electronic operations manual for new employees, covering \
highway operations, tollgate fares, discount programs, and toll policy. \
Be courteous and concise, and point out the key fact even when the \
question is imprecise. If the reference documents contain related \
information the asker did not explicitly request, include it. Answer only \
from the reference documents supplied with each question. Never guess. \
If the documents do not contain the answer, reply that the information \
is not documented in the operations manual.";

const CONTEXT_HEADER: &str = "Answer using the following reference documents:";
const CHUNK_SEPARATOR: &str = "\n\n";

/// Build the ordered message list for one completion call.
///
/// Layout: one system message, the prior turns unchanged, then one final
/// user message holding the retrieved chunks (ranked order, blank-line
/// separated) and the literal question. When retrieval found nothing the
/// final message carries the bare question; the system instructions then
/// direct the model to say the answer is not documented.
pub fn assemble(
    system_instructions: &str,
    retrieved: &[RetrievedChunk],
    history: &Conversation,
    question: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_instructions));
    messages.extend(history.messages().iter().cloned());

    let final_turn = if retrieved.is_empty() {
        question.to_string()
    } else {
        let context = retrieved
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
        format!("{CONTEXT_HEADER}\n\n{context}\n\nQuestion: {question}")
    };
    messages.push(Message::user(final_turn));

    messages
}
