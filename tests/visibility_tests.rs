// Tests for visibility preservation
//
// The wrapper of a memoized method keeps the visibility of the method it
// replaces, and the registry records it as private, protected or public.

use memery::{method_visibility, MemoizedMethods, Visibility};
use std::sync::atomic::Ordering;

mod ledger {
    use memery::{memery, MemeryCache, Memoizable};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default, Memoizable)]
    pub struct Ledger {
        cache: MemeryCache,
        pub calls: AtomicU32,
    }

    #[memery]
    impl Ledger {
        #[memoize]
        pub fn balance(&self, account: u32) -> i64 {
            self.audit(account) * 100
        }

        #[memoize]
        pub(crate) fn pending(&self, account: u32) -> i64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            i64::from(account)
        }

        #[memoize]
        fn audit(&self, account: u32) -> i64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            i64::from(account) + 1
        }
    }
}

use ledger::Ledger;

#[test]
fn test_registry_records_visibility() {
    let registry = Ledger::memoized_methods();

    assert_eq!(registry.get("balance").unwrap().visibility(), Visibility::Public);
    assert_eq!(registry.get("pending").unwrap().visibility(), Visibility::Protected);
    assert_eq!(registry.get("audit").unwrap().visibility(), Visibility::Private);
}

#[test]
fn test_private_method_is_memoized_for_internal_calls() {
    let ledger = Ledger::default();

    assert_eq!(ledger.balance(4), 500);
    assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);

    // balance and audit each hold one entry
    assert_eq!(memery::Memoizable::memery_cache(&ledger).len(), 2);
    assert!(Ledger::is_memoized("audit"));
}

#[test]
fn test_restricted_method_is_callable_in_crate() {
    let ledger = Ledger::default();

    assert_eq!(ledger.pending(9), 9);
    assert_eq!(ledger.pending(9), 9);
    assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
}

mod runtime {
    use memery::{
        method_visibility, Memery, MemeryCache, Memoizable, MemoizeError, MemoizeOptions,
        Receiver, TypeDef, Visibility,
    };

    #[derive(Default, Memoizable)]
    pub struct Vault {
        cache: MemeryCache,
    }

    pub fn vault_type() -> TypeDef<Vault> {
        let mut def = TypeDef::new("Vault");
        def.include(&Memery);
        def.define("open", Visibility::Public, |_: &Vault, (): ()| true);
        def.define("code", Visibility::Protected, |_: &Vault, (): ()| 1234u32);
        def.define("secret", Visibility::Private, |_: &Vault, (): ()| String::from("s"));
        def
    }

    #[test]
    fn test_runtime_visibility_survives_memoization() {
        let mut def = vault_type();
        let mut memoizer = def.memoizer().unwrap();
        for name in ["open", "code", "secret"] {
            assert_eq!(memoizer.memoize(name, MemoizeOptions::new()), Ok(name));
        }

        assert_eq!(method_visibility(&def, "open"), Ok(Visibility::Public));
        assert_eq!(method_visibility(&def, "code"), Ok(Visibility::Protected));
        assert_eq!(method_visibility(&def, "secret"), Ok(Visibility::Private));

        assert!(def.method::<(), String>("secret", Receiver::Explicit).is_none());
        assert!(def.method::<(), u32>("code", Receiver::Explicit).is_none());
        assert!(def.method::<(), u32>("code", Receiver::SameType).is_some());

        let vault = Vault::default();
        let secret = def.method::<(), String>("secret", Receiver::Implicit).unwrap();
        secret.call(&vault, ());
        secret.call(&vault, ());
        assert_eq!(vault.memery_cache().len(), 1);
    }

    #[test]
    fn test_undefined_method_visibility() {
        let def = vault_type();
        assert_eq!(
            method_visibility(&def, "missing"),
            Err(MemoizeError::UndefinedMethod {
                method: "missing".to_string(),
                type_name: "Vault".to_string(),
            })
        );
    }
}

#[test]
fn test_visibility_display() {
    let def = runtime::vault_type();
    assert_eq!(method_visibility(&def, "code").unwrap().to_string(), "protected");
}
