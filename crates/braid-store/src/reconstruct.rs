//! Message reconstruction from an ancestor chain.
//!
//! [`reconstruct_from_events`] rebuilds the LLM-ready message list from an
//! ordered (oldest-first) event sequence in two passes:
//!
//! 1. **Control pass**: collect deleted event IDs, full tool-call arguments,
//!    the latest reasoning level, and the system prompt.
//! 2. **Build pass**: produce messages while applying deletions, compaction,
//!    context clears, tool-result sequencing, and consecutive-role merging.
//!
//! Tool results buffer until the assistant continues the turn, then flush as
//! a single user message of `tool_result` blocks, yielding the wire sequence
//! `assistant(tool_use) → user(tool_result) → assistant`. A user reply
//! discards the buffer (the results were for display only), and nothing is
//! flushed at the end of the walk.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use crate::types::state::{Message, MessageWithEventId};
use crate::types::{EventType, SessionEvent};

/// Prefix of the synthetic user message injected after compaction.
pub const COMPACTION_SUMMARY_PREFIX: &str = "[Context from earlier in this conversation]";
/// Synthetic assistant acknowledgement injected after compaction.
pub const COMPACTION_ACK_TEXT: &str =
    "I understand the previous context. Let me continue helping you.";

/// Result of reconstructing messages from an ancestor chain.
#[derive(Clone, Debug)]
pub struct ReconstructionResult {
    /// Reconstructed messages with their source event IDs.
    pub messages_with_event_ids: Vec<MessageWithEventId>,
    /// Token usage summed over non-deleted message events. Compaction and
    /// context clears do not reset these totals.
    pub token_usage: ReconstructedTokenUsage,
    /// Highest `turn` seen on assistant events.
    pub turn_count: i64,
    /// Last reasoning level from `config.reasoning_level` events.
    pub reasoning_level: Option<String>,
    /// System prompt from `session.start`, or the hash placeholder after a
    /// `config.prompt_update`.
    pub system_prompt: Option<String>,
}

/// Token totals accumulated during reconstruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconstructedTokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub cache_creation_tokens: i64,
}

struct PendingToolResult {
    tool_call_id: String,
    content: String,
    is_error: bool,
}

/// Control state collected in the first pass.
struct ControlState {
    deleted: HashSet<String>,
    tool_call_args: HashMap<String, Value>,
    reasoning_level: Option<String>,
    system_prompt: Option<String>,
}

/// Mutable state carried through the build pass.
struct BuildState {
    messages: Vec<MessageWithEventId>,
    tokens: ReconstructedTokenUsage,
    turn_count: i64,
    pending_tool_results: Vec<PendingToolResult>,
}

/// Reconstruct messages and config state from an ordered ancestor chain.
pub fn reconstruct_from_events(ancestors: &[SessionEvent]) -> ReconstructionResult {
    let control = collect_control_state(ancestors);
    build_messages(ancestors, &control)
}

fn collect_control_state(ancestors: &[SessionEvent]) -> ControlState {
    let mut deleted = HashSet::new();
    let mut tool_call_args = HashMap::new();
    let mut reasoning_level = None;
    let mut system_prompt = None;

    for event in ancestors {
        match event.event_type {
            EventType::MessageDeleted => {
                if let Some(target) = event.payload.get("targetEventId").and_then(Value::as_str) {
                    let _ = deleted.insert(target.to_string());
                }
            }
            EventType::ToolCall => {
                let id = event.payload.get("toolCallId").and_then(Value::as_str);
                let args = event.payload.get("arguments");
                if let (Some(id), Some(args)) = (id, args) {
                    let _ = tool_call_args.insert(id.to_string(), args.clone());
                }
            }
            EventType::ConfigReasoningLevel => {
                reasoning_level = event
                    .payload
                    .get("newLevel")
                    .and_then(Value::as_str)
                    .map(String::from);
            }
            EventType::SessionStart => {
                if let Some(sp) = event.payload.get("systemPrompt").and_then(Value::as_str) {
                    system_prompt = Some(sp.to_string());
                }
            }
            EventType::ConfigPromptUpdate => {
                // Full prompt restoration from the blob is not wired up; a
                // placeholder marks that the prompt changed.
                if event.payload.get("contentBlobId").is_some() {
                    if let Some(hash) = event.payload.get("newHash").and_then(Value::as_str) {
                        system_prompt = Some(format!("[Updated prompt - hash: {hash}]"));
                    }
                }
            }
            _ => {}
        }
    }

    ControlState {
        deleted,
        tool_call_args,
        reasoning_level,
        system_prompt,
    }
}

fn build_messages(ancestors: &[SessionEvent], control: &ControlState) -> ReconstructionResult {
    let mut st = BuildState {
        messages: Vec::new(),
        tokens: ReconstructedTokenUsage::default(),
        turn_count: 0,
        pending_tool_results: Vec::new(),
    };

    for event in ancestors {
        if control.deleted.contains(event.id.as_str()) {
            continue;
        }
        if event.event_type == EventType::ContextCleared {
            handle_context_cleared(&mut st);
            continue;
        }
        if !event.event_type.produces_messages() {
            continue;
        }
        match event.event_type {
            EventType::CompactSummary => handle_compact_summary(event, &mut st),
            EventType::ToolResult => handle_tool_result(event, &mut st),
            EventType::MessageUser => handle_message_user(event, &mut st),
            EventType::MessageAssistant => handle_message_assistant(event, control, &mut st),
            _ => {}
        }
    }

    // Leftover tool results stay buffered: the session is awaiting user
    // input and the results were for display only.

    ReconstructionResult {
        messages_with_event_ids: st.messages,
        token_usage: st.tokens,
        turn_count: st.turn_count,
        reasoning_level: control.reasoning_level.clone(),
        system_prompt: control.system_prompt.clone(),
    }
}

/// `compact.summary`: wipe everything, inject the synthetic pair.
fn handle_compact_summary(event: &SessionEvent, st: &mut BuildState) {
    let summary = event
        .payload
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or("");
    st.messages.clear();
    st.pending_tool_results.clear();

    st.messages.push(MessageWithEventId {
        message: Message {
            role: "user".to_string(),
            content: Value::String(format!("{COMPACTION_SUMMARY_PREFIX}\n\n{summary}")),
        },
        event_ids: vec![None],
    });
    st.messages.push(MessageWithEventId {
        message: Message {
            role: "assistant".to_string(),
            content: json!([{ "type": "text", "text": COMPACTION_ACK_TEXT }]),
        },
        event_ids: vec![None],
    });
}

/// `context.cleared`: wipe everything, no synthetics.
fn handle_context_cleared(st: &mut BuildState) {
    st.messages.clear();
    st.pending_tool_results.clear();
}

/// `tool.result`: buffer, do not emit yet.
fn handle_tool_result(event: &SessionEvent, st: &mut BuildState) {
    st.pending_tool_results.push(PendingToolResult {
        tool_call_id: event
            .payload
            .get("toolCallId")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        content: event
            .payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        is_error: event
            .payload
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    });
}

/// `message.user`: a real user reply supersedes any pending tool results.
/// Merge into a trailing user message so the list keeps alternating.
fn handle_message_user(event: &SessionEvent, st: &mut BuildState) {
    st.pending_tool_results.clear();

    let content = event.payload.get("content").cloned().unwrap_or(Value::Null);

    if last_role(st) == Some("user") {
        let last = st.messages.last_mut().unwrap();
        last.message.content = merge_user_content(&last.message.content, &content);
        last.event_ids.push(Some(event.id.clone()));
    } else {
        st.messages.push(MessageWithEventId {
            message: Message {
                role: "user".to_string(),
                content,
            },
            event_ids: vec![Some(event.id.clone())],
        });
    }
    accumulate_tokens(&event.payload, &mut st.tokens);
}

/// `message.assistant`: flush buffered tool results between two assistant
/// messages; otherwise the buffer is orphaned (no matching `tool_use` in the
/// output) and is discarded. Then merge into a trailing assistant message.
fn handle_message_assistant(event: &SessionEvent, control: &ControlState, st: &mut BuildState) {
    let content = event.payload.get("content").cloned().unwrap_or(Value::Null);
    let content = restore_truncated_inputs(&content, &control.tool_call_args);

    if last_role(st) == Some("assistant") {
        if !st.pending_tool_results.is_empty() {
            flush_tool_results(st);
        }
    } else {
        st.pending_tool_results.clear();
    }

    if last_role(st) == Some("assistant") {
        let last = st.messages.last_mut().unwrap();
        last.message.content = merge_assistant_content(&last.message.content, &content);
        last.event_ids.push(Some(event.id.clone()));
    } else {
        st.messages.push(MessageWithEventId {
            message: Message {
                role: "assistant".to_string(),
                content,
            },
            event_ids: vec![Some(event.id.clone())],
        });
    }

    accumulate_tokens(&event.payload, &mut st.tokens);

    if let Some(turn) = event.payload.get("turn").and_then(Value::as_i64) {
        if turn > st.turn_count {
            st.turn_count = turn;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn last_role(st: &BuildState) -> Option<&str> {
    st.messages.last().map(|m| m.message.role.as_str())
}

/// Emit buffered results as one user message of `tool_result` blocks.
fn flush_tool_results(st: &mut BuildState) {
    let blocks: Vec<Value> = st
        .pending_tool_results
        .drain(..)
        .map(|tr| {
            json!({
                "type": "tool_result",
                "tool_use_id": tr.tool_call_id,
                "content": tr.content,
                "is_error": tr.is_error,
            })
        })
        .collect();

    st.messages.push(MessageWithEventId {
        message: Message {
            role: "user".to_string(),
            content: Value::Array(blocks),
        },
        event_ids: vec![None],
    });
}

/// Normalize user content to a block array.
fn normalize_user_content(content: &Value) -> Vec<Value> {
    match content {
        Value::String(s) => vec![json!({"type": "text", "text": s})],
        Value::Array(blocks) => blocks.clone(),
        _ => vec![],
    }
}

fn merge_user_content(existing: &Value, incoming: &Value) -> Value {
    let mut merged = normalize_user_content(existing);
    merged.extend(normalize_user_content(incoming));
    Value::Array(merged)
}

fn merge_assistant_content(existing: &Value, incoming: &Value) -> Value {
    let mut merged = match existing {
        Value::Array(blocks) => blocks.clone(),
        _ => vec![],
    };
    if let Value::Array(blocks) = incoming {
        merged.extend(blocks.clone());
    }
    Value::Array(merged)
}

/// Restore `tool_use` inputs flagged `_truncated` from their `tool.call`
/// events, which persist the full arguments.
fn restore_truncated_inputs(content: &Value, tool_call_args: &HashMap<String, Value>) -> Value {
    let Value::Array(blocks) = content else {
        return content.clone();
    };
    let restored: Vec<Value> = blocks
        .iter()
        .map(|block| {
            let is_tool_use = block.get("type").and_then(Value::as_str) == Some("tool_use");
            let is_truncated = block
                .get("input")
                .and_then(|i| i.get("_truncated"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if is_tool_use && is_truncated {
                if let Some(full_args) = block
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|id| tool_call_args.get(id))
                {
                    let mut restored_block = block.clone();
                    restored_block["input"] = full_args.clone();
                    return restored_block;
                }
            }
            block.clone()
        })
        .collect();
    Value::Array(restored)
}

fn accumulate_tokens(payload: &Value, tokens: &mut ReconstructedTokenUsage) {
    if let Some(tu) = payload.get("tokenUsage") {
        tokens.input_tokens += tu.get("inputTokens").and_then(Value::as_i64).unwrap_or(0);
        tokens.output_tokens += tu.get("outputTokens").and_then(Value::as_i64).unwrap_or(0);
        tokens.cache_read_tokens += tu
            .get("cacheReadTokens")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        tokens.cache_creation_tokens += tu
            .get("cacheCreationTokens")
            .and_then(Value::as_i64)
            .unwrap_or(0);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
