use criterion::{criterion_group, criterion_main, Criterion};
use enclave_oracle_core::intent::{canonical_message, verify_with_key, EnclaveSigner, IntentPayload};
use enclave_oracle_core::{InferencePayload, WeatherPayload};

fn bench_verification(c: &mut Criterion) {
    let signer = EnclaveSigner::from_seed(&[42u8; 32]);
    let key = signer.public_key();
    let weather = WeatherPayload {
        location: "New York".into(),
        temperature: 18,
    };
    let inference = InferencePayload {
        question: "What is the total revenue?".into(),
        answer: "a".repeat(2048),
        filename: "report.csv".into(),
    };

    c.bench_function("canonical_message_weather", |b| {
        b.iter(|| canonical_message(WeatherPayload::INTENT.tag(), 1_748_399_400_000, &weather))
    });

    let sig = signer
        .sign_message(WeatherPayload::INTENT.tag(), 1_748_399_400_000, &weather)
        .unwrap();
    c.bench_function("verify_weather", |b| {
        b.iter(|| verify_with_key(WeatherPayload::INTENT.tag(), 1_748_399_400_000, &weather, &sig, &key))
    });

    let sig = signer
        .sign_message(InferencePayload::INTENT.tag(), 1_748_399_400_000, &inference)
        .unwrap();
    c.bench_function("verify_inference_2k_answer", |b| {
        b.iter(|| {
            verify_with_key(InferencePayload::INTENT.tag(), 1_748_399_400_000, &inference, &sig, &key)
        })
    });

    c.bench_function("sign_weather", |b| {
        b.iter(|| signer.sign_message(WeatherPayload::INTENT.tag(), 1_748_399_400_000, &weather))
    });
}

criterion_group!(benches, bench_verification);
criterion_main!(benches);
