//! Property-based tests for the turn state machine
//!
//! These tests verify key invariants hold across arbitrary token streams.

use super::markers::{Reaction, TokenClass, TurnMarker, CONTROL_TOKENS};
use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_reaction() -> impl Strategy<Value = Reaction> {
    prop::sample::select(Reaction::ALL.to_vec())
}

fn arb_marker() -> impl Strategy<Value = TurnMarker> {
    prop_oneof![
        Just(TurnMarker::Me),
        Just(TurnMarker::Them),
        Just(TurnMarker::ConversationStart),
        Just(TurnMarker::EndOfText),
    ]
}

fn arb_token_class() -> impl Strategy<Value = TokenClass> {
    prop_oneof![
        6 => "[a-z ]{1,4}".prop_map(TokenClass::Text),
        // Plain tokens that can spell a reserved marker together
        1 => prop::sample::select(vec!["<|", "Me", "Them", "|>", "<|Me|>"])
            .prop_map(|piece| TokenClass::Text(piece.to_string())),
        2 => arb_reaction().prop_map(TokenClass::Reaction),
        1 => arb_marker().prop_map(TokenClass::Boundary),
    ]
}

fn arb_context() -> impl Strategy<Value = TurnContext> {
    (any::<bool>(), 1u32..4).prop_map(|(auto_start, max_attempts)| {
        TurnContext::new(auto_start, max_attempts, "Hey")
    })
}

/// Feed tokens until the machine stops, then exhaust the budget
fn drive(
    context: &TurnContext,
    tokens: Vec<TokenClass>,
) -> (TurnState, Vec<Effect>, Option<TransitionError>) {
    let mut state = transition(&TurnState::AwaitingUserTurn, context, TurnEvent::Begin)
        .unwrap()
        .new_state;
    let mut effects = Vec::new();

    let events = tokens
        .into_iter()
        .map(TurnEvent::Sampled)
        .chain(std::iter::once(TurnEvent::BudgetExhausted));

    for event in events {
        if state.is_terminal() {
            break;
        }
        match transition(&state, context, event) {
            Ok(result) => {
                state = result.new_state;
                effects.extend(result.effects);
            }
            Err(e) => return (state, effects, Some(e)),
        }
    }
    (state, effects, None)
}

proptest! {
    /// Every reaction token becomes exactly one standalone segment
    #[test]
    fn prop_reaction_is_standalone(
        context in arb_context(),
        pending in "[a-z ]{0,8}",
        reaction in arb_reaction(),
    ) {
        let state = TurnState::GeneratingReply { attempt: 1, pending, emitted: 0 };
        let result = transition(&state, &context, TurnEvent::Sampled(TokenClass::Reaction(reaction))).unwrap();
        prop_assert_eq!(
            result.effects,
            vec![Effect::EmitSegment(Segment::Reaction(reaction))]
        );
    }

    /// Text segments are trimmed, non-empty, and never carry control tokens
    #[test]
    fn prop_text_segments_are_clean(
        context in arb_context(),
        tokens in proptest::collection::vec(arb_token_class(), 0..40),
    ) {
        let (_, effects, _) = drive(&context, tokens);
        for effect in effects {
            if let Effect::EmitSegment(Segment::Text(text)) = effect {
                prop_assert!(!text.is_empty());
                prop_assert_eq!(text.trim(), text.as_str());
                for control in CONTROL_TOKENS {
                    prop_assert!(!text.contains(control));
                }
            }
        }
    }

    /// A completed turn reports exactly the segments it emitted
    #[test]
    fn prop_emitted_count_matches_effects(
        context in arb_context(),
        tokens in proptest::collection::vec(arb_token_class(), 0..40),
    ) {
        let (state, effects, error) = drive(&context, tokens);
        let emitted = effects
            .iter()
            .filter(|e| matches!(e, Effect::EmitSegment(_)))
            .count();

        match state {
            TurnState::TurnComplete { emitted: reported } => {
                prop_assert!(error.is_none());
                prop_assert!(reported > 0);
                prop_assert_eq!(reported, emitted);
                prop_assert_eq!(effects.last(), Some(&Effect::CompleteTurn));
            }
            TurnState::AutoStartGreeting => {
                prop_assert!(context.auto_start);
                prop_assert_eq!(emitted, 1);
            }
            _ => {}
        }
    }

    /// Auto-start turns never end in an empty-reply error
    #[test]
    fn prop_auto_start_never_fails_empty(
        max_attempts in 1u32..4,
        tokens in proptest::collection::vec(arb_token_class(), 0..40),
    ) {
        let context = TurnContext::new(true, max_attempts, "Hey");
        let (_, _, error) = drive(&context, tokens);
        let failed_empty = matches!(error, Some(TransitionError::EmptyReply { .. }));
        prop_assert!(!failed_empty, "auto-start ended without a reply: {:?}", error);
    }

    /// Retries never exceed the configured attempt ceiling
    #[test]
    fn prop_retry_is_bounded(max_attempts in 1u32..6) {
        let context = TurnContext::new(false, max_attempts, "Hey");
        let mut state = TurnState::GeneratingReply { attempt: 1, pending: String::new(), emitted: 0 };
        let mut restarts = 0;
        loop {
            match transition(&state, &context, TurnEvent::BudgetExhausted) {
                Ok(result) => {
                    restarts += 1;
                    state = result.new_state;
                }
                Err(e) => {
                    prop_assert_eq!(e, TransitionError::EmptyReply { attempts: max_attempts });
                    break;
                }
            }
            prop_assert!(restarts < max_attempts);
        }
    }
}
