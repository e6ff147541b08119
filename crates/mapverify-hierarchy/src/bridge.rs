//! Recognizes compiler-generated forwarding methods ("bouncers") and lambda bodies.

use mapverify_classfile::access::{ACC_BRIDGE, ACC_STATIC, ACC_SYNTHETIC};
use mapverify_classfile::opcodes::{is_load, ALOAD, CHECKCAST, H_INVOKESTATIC, INSTANCEOF};
use mapverify_classfile::{
    parse_method_descriptor, BootstrapArgument, Insn, InvokeDynamic, MethodHandle,
};

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
const METAFACTORY_DESC: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";
const ALT_METAFACTORY_DESC: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;[Ljava/lang/Object;)Ljava/lang/invoke/CallSite;";

/// The method a bouncer forwards to, as named by its invoke instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BounceTarget {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// Returns the implementation method of a lambda `invokedynamic`, if `indy` is bootstrapped by
/// `LambdaMetafactory.metafactory` (three static arguments) or `altMetafactory` (four or more).
pub fn lambda_target(indy: &InvokeDynamic) -> Option<&MethodHandle> {
    let bsm = &indy.bootstrap.handle;
    if bsm.kind != H_INVOKESTATIC || bsm.owner != LAMBDA_METAFACTORY || bsm.interface {
        return None;
    }
    let args = &indy.bootstrap.arguments;
    let recognized = match (bsm.name.as_str(), bsm.descriptor.as_str()) {
        ("metafactory", METAFACTORY_DESC) => args.len() == 3,
        ("altMetafactory", ALT_METAFACTORY_DESC) => args.len() >= 4,
        _ => false,
    };
    if !recognized {
        return None;
    }
    match args.get(1) {
        Some(BootstrapArgument::MethodHandle(handle)) => Some(handle),
        _ => None,
    }
}

/// Classifies a method body as a pure forwarding call.
///
/// The accepted shape is `aload 0`, then loads of consecutive parameter slots interleaved with
/// `checkcast`/`instanceof`, then one invoke whose argument/return footprint equals the
/// method's own, then a return. Only synthetic or bridge instance methods that are not lambda
/// bodies qualify.
pub fn match_bouncer(
    access: u16,
    descriptor: &str,
    code: &[Insn],
    lambda: bool,
) -> Option<BounceTarget> {
    if lambda || access & (ACC_SYNTHETIC | ACC_BRIDGE) == 0 || access & ACC_STATIC != 0 {
        return None;
    }
    let own = parse_method_descriptor(descriptor).ok()?;

    let (first, rest) = code.split_first()?;
    if !matches!(first, Insn::Var { opcode: ALOAD, slot: 0 }) {
        return None;
    }
    let (last, body) = rest.split_last()?;
    if !matches!(last, Insn::Return { .. }) {
        return None;
    }
    let (invoke, arguments) = body.split_last()?;
    let Insn::Method {
        owner,
        name,
        descriptor: target_descriptor,
        ..
    } = invoke
    else {
        return None;
    };

    let mut next_slot = 1u32;
    let mut params = own.params.iter();
    for insn in arguments {
        match insn {
            Insn::Var { opcode, slot } if is_load(*opcode) => {
                let param = params.next()?;
                if u32::from(*slot) != next_slot {
                    return None;
                }
                next_slot += param.slot_size();
            }
            Insn::Type { opcode, .. } if *opcode == CHECKCAST || *opcode == INSTANCEOF => {}
            _ => return None,
        }
    }

    let target = parse_method_descriptor(target_descriptor).ok()?;
    if target.arguments_and_return_sizes() != own.arguments_and_return_sizes() {
        return None;
    }
    Some(BounceTarget {
        owner: owner.clone(),
        name: name.clone(),
        descriptor: target_descriptor.clone(),
    })
}
