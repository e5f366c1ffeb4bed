use agentidl_core::codegen::{self, Flavor};
use agentidl_core::model;
use agentidl_core::ontology::OntologyProjector;
use criterion::{criterion_group, criterion_main, Criterion};

const SOURCE: &str = r#"
    [Context="https://agentidl.dev/contexts/trade.jsonld", Semantic="agent:Marketplace"]
    interface Marketplace {
      [Intent="agent:ProposeContract", Proof="proof:SignedOffer"]
      Promise<ContractResponse> proposeContract(ContractProposal proposal);
      [Intent="agent:ExecutePayment", Delegation]
      Promise<PaymentResult> executePayment(double amount, DOMString currency, DelegationContext ctx);
      [Intent="agent:ListEntries"]
      Promise<sequence<LedgerEntry>> entries(unsigned long long since, optional (DOMString or long)? account);
      [Intent="agent:Balances"]
      record<DOMString, double> balances();
    };
"#;

fn bench_pipeline(c: &mut Criterion) {
    c.bench_function("build_from_source", |b| {
        b.iter(|| model::build_from_source(SOURCE))
    });

    let Ok(model) = model::build_from_source(SOURCE) else {
        return;
    };
    c.bench_function("generate_typescript", |b| {
        b.iter(|| codegen::generate(&model, Flavor::TypeScript))
    });
    let projector = OntologyProjector::default();
    c.bench_function("turtle", |b| b.iter(|| projector.turtle(&model)));
    c.bench_function("model_hash", |b| b.iter(|| model::model_hash(&model)));
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
