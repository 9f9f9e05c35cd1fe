use serde_json::{Value, json};

use formflow_spec::{
    Answers, ConditionalRule, Event, Field, Form, NavigationState, Outcome, Refusal, Route,
    Section, SectionTarget, SubmitRejection, advance, can_proceed_to_next, can_submit,
    is_at_end_of_visited_path, prepare_submission, submit_available, validate_scoped,
};

fn answers(value: Value) -> Answers {
    value.as_object().cloned().unwrap_or_default()
}

fn ids(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

/// S1 asks a required name and a branching question; S2 and S3 each ask a
/// required question of their own.
fn survey() -> Form {
    Form::new("survey", "Survey")
        .with_section(Section::new("s1", "About you", 1))
        .with_section(Section::new("s2", "Details", 2))
        .with_section(Section::new("s3", "Wrap up", 3))
        .with_field(Field::text("name", "Name").required().in_section("s1"))
        .with_field(Field::text("detail", "Detail").required().in_section("s2"))
        .with_field(Field::text("closing", "Closing").required().in_section("s3"))
}

fn survey_with_branch() -> Form {
    survey().with_field(
        Field::dropdown("skip", "Skip details?", ["Yes", "No"])
            .in_section("s1")
            .with_rule(ConditionalRule::new("Yes", "s3")),
    )
}

#[test]
fn next_falls_back_to_the_following_section() {
    let form = Form::new("f", "F")
        .with_section(Section::new("s1", "One", 1))
        .with_section(Section::new("s2", "Two", 2))
        .with_field(Field::text("q", "Q").required().in_section("s1"));
    let state = NavigationState::start(&form);

    let step = advance(&form, &answers(json!({"q": "done"})), &state, Event::Next);

    assert_eq!(
        step.outcome,
        Outcome::Moved {
            from: 0,
            to: 1,
            route: Route::SequentialFallback
        }
    );
    assert!(step.state.has_visited("s1"));
    assert!(step.state.has_visited("s2"));
    assert_eq!(step.state.visited_sections.len(), 2);
}

#[test]
fn branch_answer_skips_a_section() {
    let form = survey_with_branch();
    let state = NavigationState::start(&form);
    let current = answers(json!({"name": "Ada", "skip": "Yes"}));

    let step = advance(&form, &current, &state, Event::Answered { field_id: "skip" });

    assert_eq!(
        step.outcome,
        Outcome::Moved {
            from: 0,
            to: 2,
            route: Route::BranchTrigger
        }
    );
    assert_eq!(ids(&step.state.section_path), ["s1", "s3"]);
    assert!(!step.state.has_visited("s2"));

    let finished = answers(json!({"name": "Ada", "skip": "Yes", "closing": "bye"}));
    let report = validate_scoped(&form, &finished, &step.state.visited_sections);
    assert!(report.is_valid(), "s2 must not be validated: {report:?}");
    assert!(report.skipped.contains(&"detail".to_string()));
    assert!(can_submit(&form, &finished, &step.state));
}

#[test]
fn configured_end_submits_regardless_of_remaining_sections() {
    let mut form = survey();
    form.sections[0].next_section_id = Some(SectionTarget::End);
    let state = NavigationState::start(&form);

    let step = advance(&form, &answers(json!({"name": "Ada"})), &state, Event::Next);

    assert_eq!(
        step.outcome,
        Outcome::Submit {
            route: Route::ConfiguredNext
        }
    );
    assert_eq!(step.state.current_section_index, 0);
    let data = prepare_submission(&form, &answers(json!({"name": "Ada"})), &step.state)
        .expect("only s1 is on the path");
    assert_eq!(data.get("name"), Some(&json!("Ada")));
}

#[test]
fn unanswered_branching_dropdown_blocks_next() {
    let form = Form::new("f", "F")
        .with_section(Section::new("s1", "One", 1))
        .with_section(Section::new("s2", "Two", 2))
        .with_field(
            Field::dropdown("pick", "Pick", ["A", "B"])
                .in_section("s1")
                .with_rule(ConditionalRule::new("A", "s2")),
        );
    let state = NavigationState::start(&form);
    let empty = Answers::new();

    assert!(!can_proceed_to_next(&form, &empty, &state));
    let step = advance(&form, &empty, &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Refused {
            reason: Refusal::BranchPending {
                fields: vec!["pick".into()]
            }
        }
    );
    assert_eq!(step.state, state);
}

#[test]
fn stale_rule_option_is_ignored_everywhere() {
    let form = Form::new("f", "F")
        .with_section(Section::new("s1", "One", 1))
        .with_section(Section::new("s2", "Two", 2))
        .with_section(Section::new("s3", "Three", 3))
        .with_field(
            Field::dropdown("pick", "Pick", ["A"])
                .in_section("s1")
                .with_rule(ConditionalRule::new("Removed", "s3")),
        );
    let state = NavigationState::start(&form);
    let picked = answers(json!({"pick": "Removed"}));

    let step = advance(&form, &picked, &state, Event::Answered { field_id: "pick" });
    assert_eq!(step.outcome, Outcome::Stayed);
    assert!(validate_scoped(&form, &picked, &state.visited_sections).is_valid());

    let mut saved = form.clone();
    saved.prepare_for_save();
    assert!(saved.field("pick").unwrap().conditional_logic.is_none());
}

#[test]
fn allow_next_false_keeps_the_respondent_in_place() {
    let mut form = survey();
    form.sections[0].allow_next = false;
    let state = NavigationState::start(&form);
    let full = answers(json!({"name": "Ada"}));

    assert!(!can_proceed_to_next(&form, &full, &state));
    let step = advance(&form, &full, &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Refused {
            reason: Refusal::NextDisabled
        }
    );
    assert_eq!(step.state.current_section_index, 0);
}

#[test]
fn missing_required_answer_refuses_next() {
    let form = survey();
    let state = NavigationState::start(&form);
    let step = advance(&form, &Answers::new(), &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Refused {
            reason: Refusal::MissingRequired {
                fields: vec!["name".into()]
            }
        }
    );
}

#[test]
fn branch_fires_on_answer_even_with_required_fields_open() {
    let form = survey_with_branch();
    let state = NavigationState::start(&form);
    let partial = answers(json!({"skip": "Yes"}));

    let step = advance(&form, &partial, &state, Event::Answered { field_id: "skip" });
    assert_eq!(
        step.outcome,
        Outcome::Moved {
            from: 0,
            to: 2,
            route: Route::BranchTrigger
        }
    );
    assert_eq!(ids(&step.state.section_path), ["s1", "s3"]);

    let finished = answers(json!({"skip": "Yes", "closing": "bye"}));
    match prepare_submission(&form, &finished, &step.state) {
        Err(SubmitRejection::Invalid(report)) => {
            assert_eq!(report.error_for("name"), Some("This field is required"));
            assert!(report.error_for("detail").is_none());
        }
        other => panic!("expected the skipped required field to block submit, got {other:?}"),
    }
}

#[test]
fn next_follows_configured_section_after_branching_back() {
    let form = Form::new("loop", "Loop")
        .with_section(Section::new("s1", "One", 1).with_next("s2"))
        .with_section(Section::new("s2", "Two", 2))
        .with_section(Section::new("s3", "Three", 3))
        .with_field(
            Field::dropdown("pick", "Pick", ["Yes", "No"])
                .in_section("s1")
                .with_rule(ConditionalRule::new("Yes", "s3")),
        )
        .with_field(
            Field::dropdown("back", "Go back?", ["Back", "Stay"])
                .in_section("s3")
                .with_rule(ConditionalRule::new("Back", "s1")),
        );
    let state = NavigationState::start(&form);

    let current = answers(json!({"pick": "Yes"}));
    let step = advance(&form, &current, &state, Event::Answered { field_id: "pick" });
    assert_eq!(step.state.current_section_index, 2);

    let current = answers(json!({"pick": "Yes", "back": "Back"}));
    let step = advance(&form, &current, &step.state, Event::Answered { field_id: "back" });
    assert_eq!(step.state.current_section_index, 0);

    let step = advance(&form, &current, &step.state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Moved {
            from: 0,
            to: 1,
            route: Route::ConfiguredNext
        }
    );
    assert_eq!(ids(&step.state.section_path), ["s1", "s3", "s1", "s2"]);
}

#[test]
fn branch_to_end_is_an_implicit_submit() {
    let form = survey().with_field(
        Field::dropdown("quit", "Stop here?", ["Yes", "No"])
            .in_section("s1")
            .with_rule(ConditionalRule::new("Yes", SectionTarget::End)),
    );
    let state = NavigationState::start(&form);
    let current = answers(json!({"name": "Ada", "quit": "Yes"}));

    let step = advance(&form, &current, &state, Event::Answered { field_id: "quit" });
    assert_eq!(
        step.outcome,
        Outcome::Submit {
            route: Route::BranchTrigger
        }
    );
    assert!(prepare_submission(&form, &current, &step.state).is_ok());
}

#[test]
fn answer_without_matching_rule_stays() {
    let form = survey_with_branch();
    let state = NavigationState::start(&form);
    let current = answers(json!({"name": "Ada", "skip": "No"}));
    let step = advance(&form, &current, &state, Event::Answered { field_id: "skip" });
    assert_eq!(step.outcome, Outcome::Stayed);

    let step = advance(&form, &current, &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Moved {
            from: 0,
            to: 1,
            route: Route::SequentialFallback
        }
    );
}

#[test]
fn visited_fallback_resumes_branch_path_after_backward_jump() {
    let form = Form::new("f", "F")
        .with_section(Section::new("s1", "One", 1))
        .with_section(Section::new("s2", "Two", 2))
        .with_section(Section::new("s3", "Three", 3))
        .with_section(Section::new("s4", "Four", 4).with_next("s2"))
        .with_field(
            Field::dropdown("jump", "Jump", ["Far"])
                .in_section("s1")
                .with_rule(ConditionalRule::new("Far", "s4")),
        );
    let current = answers(json!({"jump": "Far"}));
    let state = NavigationState::start(&form);

    let at_s4 = advance(&form, &current, &state, Event::Answered { field_id: "jump" }).state;
    let at_s2 = advance(&form, &current, &at_s4, Event::Next);
    assert_eq!(
        at_s2.outcome,
        Outcome::Moved {
            from: 3,
            to: 1,
            route: Route::ConfiguredNext
        }
    );
    assert!(!is_at_end_of_visited_path(&form, &at_s2.state));

    let resumed = advance(&form, &current, &at_s2.state, Event::Next);
    assert_eq!(
        resumed.outcome,
        Outcome::Moved {
            from: 1,
            to: 3,
            route: Route::VisitedFallback
        }
    );
    assert!(!resumed.state.has_visited("s3"));
    assert_eq!(ids(&resumed.state.section_path), ["s1", "s4", "s2", "s4"]);
}

#[test]
fn dangling_next_section_falls_through_to_sequential() {
    let form = Form::new("f", "F")
        .with_section(Section::new("s1", "One", 1).with_next("deleted"))
        .with_section(Section::new("s2", "Two", 2));
    let state = NavigationState::start(&form);
    let step = advance(&form, &Answers::new(), &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Moved {
            from: 0,
            to: 1,
            route: Route::SequentialFallback
        }
    );
}

#[test]
fn last_section_without_submit_reports_dead_end() {
    let form = Form::new("f", "F")
        .with_section(Section::new("s1", "One", 1))
        .with_section(Section::new("s2", "Two", 2).with_flags(false, true));
    let state = NavigationState::start(&form);
    let at_s2 = advance(&form, &Answers::new(), &state, Event::Next).state;

    assert!(!submit_available(&form, &at_s2));
    let step = advance(&form, &Answers::new(), &at_s2, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::CannotSubmitHere {
            route: Route::Terminal
        }
    );
    assert_eq!(
        prepare_submission(&form, &Answers::new(), &at_s2),
        Err(SubmitRejection::NotAllowedHere)
    );
}

#[test]
fn single_section_form_submits_even_when_flag_is_off() {
    let form = Form::new("f", "F")
        .with_section(Section::new("only", "Only", 1).with_flags(false, true))
        .with_field(Field::text("q", "Q").required().in_section("only"));
    let state = NavigationState::start(&form);

    assert!(submit_available(&form, &state));
    assert!(!can_submit(&form, &Answers::new(), &state));
    assert!(can_submit(&form, &answers(json!({"q": "x"})), &state));
}

#[test]
fn sectionless_form_validates_every_field() {
    let form = Form::new("f", "F").with_field(Field::text("q", "Q").required());
    let state = NavigationState::start(&form);

    match prepare_submission(&form, &Answers::new(), &state) {
        Err(SubmitRejection::Invalid(report)) => {
            assert_eq!(report.error_for("q"), Some(formflow_spec::REQUIRED_MESSAGE));
        }
        other => panic!("expected invalid, got {other:?}"),
    }
    let step = advance(&form, &answers(json!({"q": "x"})), &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Submit {
            route: Route::Terminal
        }
    );
}

#[test]
fn submitted_state_refuses_further_steps() {
    let form = survey();
    let done = NavigationState::start(&form).mark_submitted();
    let step = advance(&form, &answers(json!({"name": "x"})), &done, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Refused {
            reason: Refusal::Finished
        }
    );
    assert_eq!(
        prepare_submission(&form, &Answers::new(), &done),
        Err(SubmitRejection::AlreadySubmitted)
    );
}

#[test]
fn unsectioned_fields_belong_to_first_section() {
    let form = survey().with_field(Field::text("legacy", "Legacy").required());
    let state = NavigationState::start(&form);
    let step = advance(&form, &answers(json!({"name": "Ada"})), &state, Event::Next);
    assert_eq!(
        step.outcome,
        Outcome::Refused {
            reason: Refusal::MissingRequired {
                fields: vec!["legacy".into()]
            }
        }
    );
}

#[test]
fn submission_drops_answers_for_unknown_fields() {
    let form = Form::new("f", "F").with_field(Field::text("q", "Q"));
    let state = NavigationState::start(&form);
    let data = prepare_submission(&form, &answers(json!({"q": "x", "ghost": 1})), &state)
        .expect("valid");
    assert_eq!(data.len(), 1);
    assert!(data.contains_key("q"));
}
