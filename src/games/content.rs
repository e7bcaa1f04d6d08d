/// A multiple-choice quiz question
#[derive(Debug)]
pub struct QuizQuestion {
    pub prompt: &'static str,
    pub options: &'static [&'static str],
    /// Lower-case text an answer must contain to count
    pub answer: &'static str,
}

pub static QUESTION_BANK: &[QuizQuestion] = &[
    QuizQuestion {
        prompt: "Which planet is known as the red planet?",
        options: &["A. Venus", "B. Mars", "C. Jupiter"],
        answer: "mars",
    },
    QuizQuestion {
        prompt: "What is the largest ocean on Earth?",
        options: &["A. Atlantic", "B. Indian", "C. Pacific"],
        answer: "pacific",
    },
    QuizQuestion {
        prompt: "What is the capital of Japan?",
        options: &["A. Osaka", "B. Tokyo", "C. Kyoto"],
        answer: "tokyo",
    },
    QuizQuestion {
        prompt: "Which gas do plants take in from the air?",
        options: &["A. Oxygen", "B. Nitrogen", "C. Carbon dioxide"],
        answer: "carbon dioxide",
    },
    QuizQuestion {
        prompt: "How many legs does a spider have?",
        options: &["A. Six", "B. Eight", "C. Ten"],
        answer: "eight",
    },
];

pub static TRUTHS: &[&str] = &[
    "What is the most embarrassing song on your playlist?",
    "Who is the person you admire the most, and why?",
    "What is a habit you have never told anyone about?",
    "What was your funniest childhood nickname?",
];

pub static DARES: &[&str] = &[
    "Send five cat emojis in a row.",
    "Describe your day using only three words.",
    "Type your next message with your eyes closed.",
    "Share the last photo you took, without explaining it.",
];
