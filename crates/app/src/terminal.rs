//! Line-oriented presentation of a running attempt.

use std::io::Write;

use quiz_core::quiz::{OptionMark, QuizPhase, QuizSnapshot};
use remote::QuizContext;
use services::{QuizEvent, QuizRunner, QuizView, TutorChat};
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the learner typed, already mapped onto the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Event(QuizEvent),
    Ask(String),
    Time,
    Help,
    Quit,
    Unknown(String),
}

pub(crate) fn parse_input(line: &str, snapshot: Option<&QuizSnapshot>) -> Input {
    let line = line.trim();
    if let Some(question) = line.strip_prefix('?') {
        return Input::Ask(question.trim().to_owned());
    }
    let reviewing = snapshot.is_some_and(|s| s.review_mode);

    match line.to_ascii_lowercase().as_str() {
        "n" | "next" if reviewing => Input::Event(QuizEvent::ReviewNext),
        "p" | "prev" if reviewing => Input::Event(QuizEvent::ReviewPrevious),
        "n" | "next" => Input::Event(QuizEvent::Advance),
        "p" | "prev" => Input::Event(QuizEvent::Retreat),
        "s" | "skip" => Input::Event(QuizEvent::Skip),
        "submit" => Input::Event(QuizEvent::Submit),
        "r" | "review" => Input::Event(QuizEvent::ToggleReview),
        "t" | "time" => Input::Time,
        "h" | "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        other => option_by_label(other, snapshot)
            .map_or_else(|| Input::Unknown(line.to_owned()), Input::Event),
    }
}

fn option_by_label(raw: &str, snapshot: Option<&QuizSnapshot>) -> Option<QuizEvent> {
    let mut chars = raw.chars();
    let label = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }
    snapshot?
        .question
        .options
        .iter()
        .find(|option| option.label == label)
        .map(|option| QuizEvent::SelectOption(option.id))
}

fn print_help() {
    println!("  a, b, c, ...  choose an option");
    println!("  n / p         next / previous question");
    println!("  s             skip (clears the answer)");
    println!("  submit        finish the quiz");
    println!("  r             toggle review after finishing");
    println!("  t             show remaining time");
    println!("  ? <text>      ask the AI tutor");
    println!("  q             quit");
}

fn marker(mark: OptionMark) -> &'static str {
    match mark {
        OptionMark::Neutral => " ",
        OptionMark::Correct => "+",
        OptionMark::Wrong => "x",
        OptionMark::Missed => "!",
    }
}

pub(crate) fn render(snapshot: &QuizSnapshot) {
    let question = &snapshot.question;
    println!();
    if snapshot.review_mode {
        println!("Review {}/{}", question.index + 1, snapshot.total_questions);
    } else {
        println!(
            "Question {}/{}  [{}%]  time left {}",
            question.index + 1,
            snapshot.total_questions,
            snapshot.progress_percent,
            snapshot.time_label
        );
    }
    println!("{} ({} points)", question.prompt, question.points);
    for option in &question.options {
        println!("  [{}] {}. {}", marker(option.mark), option.label, option.text);
    }

    if snapshot.phase == QuizPhase::Completed && !snapshot.review_mode {
        let verdict = if snapshot.passed == Some(true) {
            "passed"
        } else {
            "not passed"
        };
        println!();
        println!(
            "Score {}/{} ({}%), {verdict}. Type `r` to review your answers.",
            snapshot.score, snapshot.max_score, snapshot.percentage
        );
    }
}

/// The parts of a snapshot whose change is worth a redraw; the countdown
/// alone is not.
fn redraw_key(snapshot: &QuizSnapshot) -> (QuizPhase, usize, bool, Vec<Option<String>>) {
    (
        snapshot.phase,
        snapshot.question.index,
        snapshot.review_mode,
        snapshot.answers.clone(),
    )
}

/// Drive `runner` from stdin until the learner quits or input ends.
pub(crate) async fn run_quiz(
    runner: QuizRunner,
    mut tutor: TutorChat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = runner.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_key = None;

    println!("Loading quiz...");
    loop {
        let current = view.borrow_and_update().clone();
        match &current {
            QuizView::Loading => {}
            QuizView::LoadFailed(err) => {
                println!("Could not start the quiz: {err}");
                break;
            }
            QuizView::Ready(snapshot) => {
                let key = redraw_key(snapshot);
                if last_key.as_ref() != Some(&key) {
                    render(snapshot);
                    print!("> ");
                    std::io::stdout().flush()?;
                    last_key = Some(key);
                }
            }
        }

        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line, current.snapshot()) {
                    Input::Event(event) => {
                        if !runner.send(event).await {
                            break;
                        }
                    }
                    Input::Ask(message) => {
                        let quiz = current.snapshot().map(context).unwrap_or_default();
                        if let Some(reply) = tutor.send(&message, quiz).await {
                            println!("tutor: {}", reply.text);
                        }
                    }
                    Input::Time => {
                        if let Some(snapshot) = current.snapshot() {
                            println!("time left {}", snapshot.time_label);
                        }
                    }
                    Input::Help => print_help(),
                    Input::Quit => break,
                    Input::Unknown(raw) => println!("unknown input `{raw}`, type `help`"),
                }
                print!("> ");
                std::io::stdout().flush()?;
            }
        }
    }

    runner.shutdown().await;
    Ok(())
}

fn context(snapshot: &QuizSnapshot) -> QuizContext {
    QuizContext {
        completed: snapshot.is_complete(),
        score: snapshot.score,
        total_questions: snapshot.total_questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, OptionId, Question, QuestionId};
    use quiz_core::quiz::QuizSession;
    use quiz_core::time::fixed_now;

    fn snapshot() -> QuizSnapshot {
        let question = Question::new(
            QuestionId::new(1),
            "Which unit stores data long term?",
            vec![
                AnswerOption::new(OptionId::new(7), "RAM"),
                AnswerOption::new(OptionId::new(8), "SSD"),
            ],
            "SSD",
        )
        .unwrap();
        QuizSession::start(vec![question], 60, fixed_now())
            .unwrap()
            .snapshot()
    }

    #[test]
    fn option_letters_map_to_option_ids() {
        let snap = snapshot();
        assert_eq!(
            parse_input("b", Some(&snap)),
            Input::Event(QuizEvent::SelectOption(OptionId::new(8)))
        );
        assert_eq!(parse_input("z", Some(&snap)), Input::Unknown("z".to_owned()));
    }

    #[test]
    fn navigation_follows_review_mode() {
        let mut snap = snapshot();
        assert_eq!(parse_input("n", Some(&snap)), Input::Event(QuizEvent::Advance));
        snap.review_mode = true;
        assert_eq!(
            parse_input("n", Some(&snap)),
            Input::Event(QuizEvent::ReviewNext)
        );
    }

    #[test]
    fn question_mark_asks_the_tutor() {
        assert_eq!(
            parse_input("? what is a bit", None),
            Input::Ask("what is a bit".to_owned())
        );
        assert_eq!(parse_input(" Q ", None), Input::Quit);
    }

    #[test]
    fn chosen_option_is_marked_while_answering() {
        let question = Question::new(
            QuestionId::new(1),
            "Which unit stores data long term?",
            vec![
                AnswerOption::new(OptionId::new(7), "RAM"),
                AnswerOption::new(OptionId::new(8), "SSD"),
            ],
            "SSD",
        )
        .unwrap();
        let mut session = QuizSession::start(vec![question], 60, fixed_now()).unwrap();
        session.select_option(OptionId::new(7)).unwrap();

        let marks: Vec<_> = session
            .snapshot()
            .question
            .options
            .iter()
            .map(|option| marker(option.mark))
            .collect();
        assert_eq!(marks, ["x", " "]);
    }
}
