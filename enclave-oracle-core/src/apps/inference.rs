//! AI inference oracle — attested model answers about an uploaded file

use serde::{Deserialize, Serialize};

use super::{submit_payload, Application, OutputRecord};
use crate::error::Result;
use crate::intent::{sanitize_question, sanitize_text, validate_text, IntentPayload, IntentScope};
use crate::registry::{EnclaveIdentity, OneTimeWitness};

pub struct Inference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferencePayload {
    pub question: String,
    pub answer: String,
    pub filename: String,
}

impl IntentPayload for InferencePayload {
    const INTENT: IntentScope = IntentScope::Inference;

    fn validate(&self) -> Result<()> {
        validate_text("question", &self.question)?;
        validate_text("answer", &self.answer)?;
        validate_text("filename", &self.filename)
    }

    fn normalize(self) -> Self {
        InferencePayload {
            question: sanitize_question(&self.question),
            answer: sanitize_text(&self.answer),
            filename: self.filename,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub question: String,
    pub answer: String,
    pub filename: String,
    pub timestamp_ms: u64,
}

impl OutputRecord for InferenceRecord {
    const KIND: &'static str = "InferenceRecord";
}

impl Application for Inference {
    type Payload = InferencePayload;
    type Record = InferenceRecord;

    fn mint(payload: InferencePayload, timestamp_ms: u64) -> InferenceRecord {
        InferenceRecord {
            question: payload.question,
            answer: payload.answer,
            filename: payload.filename,
            timestamp_ms,
        }
    }
}

pub fn submit<T: OneTimeWitness>(
    question: &str,
    answer: &str,
    filename: &str,
    timestamp_ms: u64,
    signature: &[u8],
    identity: &EnclaveIdentity<T>,
) -> Result<InferenceRecord> {
    let payload = InferencePayload {
        question: question.to_string(),
        answer: answer.to_string(),
        filename: filename.to_string(),
    };
    submit_payload::<Inference, T>(payload, timestamp_ms, signature, identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::weather::{self, WeatherPayload};
    use crate::apps::Oracle;
    use crate::error::OracleError;
    use crate::intent::{canonical_message, verify_signature, EnclaveSigner};
    use crate::registry::detached_identity;

    fn payload() -> InferencePayload {
        InferencePayload {
            question: "What is the total revenue?".into(),
            answer: "The total revenue is USD 4.2 million".into(),
            filename: "report.csv".into(),
        }
    }

    #[test]
    fn test_submit_valid() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        let signed = signer.sign(payload(), 7).unwrap();
        let sig = signed.signature_bytes().unwrap();

        let p = payload();
        let record = submit(&p.question, &p.answer, &p.filename, 7, &sig, &identity).unwrap();
        assert_eq!(record.answer, p.answer);
        assert_eq!(record.filename, "report.csv");
        assert_eq!(record.timestamp_ms, 7);
    }

    #[test]
    fn test_canonical_bytes() {
        let p = InferencePayload {
            question: "q".into(),
            answer: "a".into(),
            filename: "f.txt".into(),
        };
        let bytes = canonical_message(InferencePayload::INTENT.tag(), 5, &p).unwrap();
        assert_eq!(hex::encode(bytes), "0105000000000000000171016105662e747874");
    }

    #[test]
    fn test_every_field_bit_matters() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        let sig = signer.sign(payload(), 7).unwrap().signature_bytes().unwrap();
        let tag = InferencePayload::INTENT.tag();

        fn question(p: &mut InferencePayload) -> &mut String {
            &mut p.question
        }
        fn answer(p: &mut InferencePayload) -> &mut String {
            &mut p.answer
        }
        fn filename(p: &mut InferencePayload) -> &mut String {
            &mut p.filename
        }

        let fields: [fn(&mut InferencePayload) -> &mut String; 3] = [question, answer, filename];
        for field in fields {
            let len = field(&mut payload()).len();
            for i in 0..len {
                for bit in 0..8 {
                    let mut mutated = payload();
                    let mut bytes = std::mem::take(field(&mut mutated)).into_bytes();
                    bytes[i] ^= 1 << bit;
                    let Ok(text) = String::from_utf8(bytes) else {
                        continue;
                    };
                    *field(&mut mutated) = text;
                    assert!(
                        !verify_signature(tag, 7, &mutated, &sig, &identity),
                        "byte {} bit {} flip still verified",
                        i,
                        bit
                    );
                }
            }
        }
        assert!(verify_signature(tag, 7, &payload(), &sig, &identity));

        let p = payload();
        assert!(submit(&p.question, &p.answer, "report.tsv", 7, &sig, &identity).is_err());
    }

    #[test]
    fn test_shifted_field_boundary_rejected() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        let signed = signer
            .sign(
                InferencePayload {
                    question: "ab".into(),
                    answer: "c".into(),
                    filename: "f".into(),
                },
                1,
            )
            .unwrap();
        let sig = signed.signature_bytes().unwrap();
        assert!(submit("ab", "c", "f", 1, &sig, &identity).is_ok());
        assert!(submit("a", "bc", "f", 1, &sig, &identity).is_err());
    }

    #[test]
    fn test_weather_signature_rejected_by_inference() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        let weather = WeatherPayload {
            location: "New York".into(),
            temperature: 18,
        };
        let sig = signer.sign(weather.clone(), 1_000).unwrap().signature_bytes().unwrap();

        // genuine for weather
        assert!(weather::submit("New York", 18, 1_000, &sig, &identity).is_ok());
        // reused bytes against the inference entry point
        let err = submit("New York", "18", "", 1_000, &sig, &identity).unwrap_err();
        assert!(matches!(err, OracleError::SignatureInvalid));
    }

    #[test]
    fn test_same_bytes_under_wrong_intent_rejected() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        // signed with the weather tag but an inference-shaped payload
        let sig = signer
            .sign_message(IntentScope::Weather.tag(), 3, &payload())
            .unwrap();
        let p = payload();
        let err = submit(&p.question, &p.answer, &p.filename, 3, &sig, &identity).unwrap_err();
        assert!(matches!(err, OracleError::SignatureInvalid));
    }

    #[test]
    fn test_control_characters_rejected_by_verifier() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        let raw = InferencePayload {
            answer: "line one\tline two".into(),
            ..payload()
        };
        assert!(matches!(raw.validate(), Err(OracleError::MalformedPayload(_))));

        let sig = signer.sign_message(InferencePayload::INTENT.tag(), 1, &raw).unwrap();
        let err = submit(&raw.question, &raw.answer, &raw.filename, 1, &sig, &identity).unwrap_err();
        assert!(matches!(err, OracleError::MalformedPayload(_)));
    }

    #[test]
    fn test_multiline_answer_signed_after_cleanup() {
        let signer = EnclaveSigner::generate();
        let identity = detached_identity::<Oracle>(signer.public_key());
        let raw = InferencePayload {
            question: "What is the \"total\"\nrevenue?".into(),
            answer: "**Total revenue:**\n$4.2 million\n".into(),
            filename: "report.csv".into(),
        };

        let signed = signer.sign(raw, 11).unwrap();
        let p = &signed.response.data;
        assert_eq!(p.question, "What is the 'total' revenue?");
        assert_eq!(p.answer, "Total revenue: USD 4.2 million");

        let sig = signed.signature_bytes().unwrap();
        let record = submit(&p.question, &p.answer, &p.filename, 11, &sig, &identity).unwrap();
        assert_eq!(record.answer, "Total revenue: USD 4.2 million");
    }
}
