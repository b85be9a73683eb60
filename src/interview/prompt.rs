//! Instruction text sent to the model for each interview turn.

use super::transcript::Transcript;

/// Number of valid answers collected before the model gives feedback.
/// Enforced by the instructions only; the session does not count turns.
pub const QUESTION_BUDGET: usize = 6;

/// Instructions that open an interview for `job_title`.
pub fn first_turn_prompt(job_title: &str) -> String {
    let job = job_title.trim();
    let n = QUESTION_BUDGET;
    format!(
        "You are a professional interviewer for {job}. Ask exactly {n} questions, one at a time, \
starting with: \"Tell me about your previous experience with {job}.\" Adjust wording of the first \
question if needed so it reads naturally for the given job type. Do not include greetings. Each \
follow-up must be based only on the candidate's previous answer, professional, varied, and one \
sentence max. If off-topic, redirect without counting it as one of the {n} questions. If they \
skip/refuse, rephrase or explain why it matters; if they continue, end the interview. After {n} \
valid answers, give a 3-sentence feedback summary of strengths and improvements."
    )
}

/// Instructions for every turn after the first: the opening instructions,
/// the dialogue so far, and a reminder of the turn rules.
pub fn follow_up_prompt(original_prompt: &str, transcript: &Transcript) -> String {
    format!(
        "Here is the chat history so far: User: {original_prompt}\n{history}\n\n\
Give your next reply as the interviewer. Remember to:\n\
- Ask one question at a time\n\
- Base your questions on their responses\n\
- After {QUESTION_BUDGET} questions total, provide feedback and suggestions for improvement",
        history = transcript.render(),
    )
}
